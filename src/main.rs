use config::{load_rule_file, parse_args};
use dispatch::driver::NullDriver;
use server::{Server, ServerConfig};
use std::error::Error;
use std::sync::Arc;

#[cfg(not(windows))]
use jemallocator::Jemalloc;

#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<(), Box<dyn Error>> {
    let options = parse_args(std::env::args())?;

    let log_level = if options.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut rules = Vec::new();
    for path in &options.config_files {
        log::info!("loading rule file {}", path);
        rules.extend(load_rule_file(path)?);
    }

    let mut config = ServerConfig::new(rules, Arc::new(NullDriver));
    config.default_dsn = options.default_dsn.clone();
    config.remote_dsn = options.remote_dsn.clone();

    let listen_address = options.listen_address();
    log::info!("listening on {}", listen_address);
    let mut server = Server::new(config);
    server.listen(&listen_address)?;
    Ok(())
}
