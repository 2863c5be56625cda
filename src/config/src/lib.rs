pub mod cli;
pub mod error;
pub mod rulefile;

pub use cli::{parse_args, Options};
pub use error::Error;
pub use rulefile::load_rule_file;
