use std::fmt::{Display, Formatter};

/// Failures that can happen while assembling a runnable configuration,
/// before any connection is ever accepted.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Regex(regex::Error),
    InvalidPort(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => Display::fmt(err, f),
            Error::Json(err) => Display::fmt(err, f),
            Error::Regex(err) => Display::fmt(err, f),
            Error::InvalidPort(value) => write!(f, "invalid port '{}'", value),
        }
    }
}

impl std::error::Error for Error {}
