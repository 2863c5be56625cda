pub mod conn;
pub mod driver;
pub mod error;
pub mod rules;

pub use conn::{ConnState, Dsn};
pub use error::Error;
pub use rules::{dispatch, DataValue, HookValue, MatchSpec, OkValue, Response, Rule};
