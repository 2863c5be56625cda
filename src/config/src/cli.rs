//! Command-line parsing for the `rulewire` binary.

use crate::error::Error;
use clap::{App, Arg};
use dispatch::Dsn;

#[derive(Debug, Clone)]
pub struct Options {
    pub port: u16,
    pub interface: String,
    pub default_dsn: Option<Dsn>,
    pub remote_dsn: Option<Dsn>,
    pub config_files: Vec<String>,
    pub debug: bool,
}

impl Options {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.interface, self.port)
    }
}

pub fn parse_args<I, T>(args: I) -> Result<Options, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = App::new("rulewire")
        .about("A programmable MySQL wire-protocol frontend")
        .arg(
            Arg::with_name("port")
                .long("port")
                .takes_value(true)
                .default_value("23306"),
        )
        .arg(
            Arg::with_name("interface")
                .long("interface")
                .takes_value(true)
                .default_value("127.0.0.1"),
        )
        .arg(Arg::with_name("dsn").long("dsn").takes_value(true))
        .arg(Arg::with_name("dsn_user").long("dsn_user").takes_value(true))
        .arg(
            Arg::with_name("dsn_password")
                .long("dsn_password")
                .takes_value(true),
        )
        .arg(Arg::with_name("remote_dsn").long("remote_dsn").takes_value(true))
        .arg(
            Arg::with_name("remote_dsn_user")
                .long("remote_dsn_user")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("remote_dsn_password")
                .long("remote_dsn_password")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(Arg::with_name("debug").long("debug"))
        .get_matches_from(args);

    let port: u16 = matches
        .value_of("port")
        .unwrap()
        .parse()
        .map_err(|_| Error::InvalidPort(matches.value_of("port").unwrap().to_string()))?;

    let default_dsn = matches.value_of("dsn").map(|dsn| Dsn {
        dsn: dsn.to_string(),
        user: matches.value_of("dsn_user").unwrap_or("").to_string(),
        password: matches.value_of("dsn_password").unwrap_or("").to_string(),
    });

    let remote_dsn = matches.value_of("remote_dsn").map(|dsn| Dsn {
        dsn: dsn.to_string(),
        user: matches.value_of("remote_dsn_user").unwrap_or("").to_string(),
        password: matches
            .value_of("remote_dsn_password")
            .unwrap_or("")
            .to_string(),
    });

    let config_files = matches
        .values_of("config")
        .map(|values| values.map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Options {
        port,
        interface: matches.value_of("interface").unwrap().to_string(),
        default_dsn,
        remote_dsn,
        config_files,
        debug: matches.is_present("debug"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = parse_args(vec!["rulewire"]).unwrap();
        assert_eq!(options.port, 23306);
        assert_eq!(options.interface, "127.0.0.1");
        assert!(options.default_dsn.is_none());
        assert!(options.config_files.is_empty());
        assert!(!options.debug);
    }

    #[test]
    fn test_overrides() {
        let options = parse_args(vec![
            "rulewire",
            "--port",
            "3306",
            "--interface",
            "0.0.0.0",
            "--dsn",
            "mydb",
            "--dsn_user",
            "root",
            "--config",
            "a.json",
            "--config",
            "b.json",
            "--debug",
        ])
        .unwrap();
        assert_eq!(options.port, 3306);
        assert_eq!(options.interface, "0.0.0.0");
        assert_eq!(options.default_dsn.unwrap().user, "root");
        assert_eq!(options.config_files, vec!["a.json", "b.json"]);
        assert!(options.debug);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        assert!(parse_args(vec!["rulewire", "--port", "not-a-number"]).is_err());
    }
}
