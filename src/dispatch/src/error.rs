use std::fmt::{Display, Formatter};

/// The error kinds the connection loop can encounter, unified so it has one
/// place to decide whether to close the socket or emit an ERR packet and
/// keep going.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Protocol(wire::Error),
    Auth,
    Driver {
        code: u16,
        sql_state: String,
        message: String,
    },
    Rule(String),
    UnsupportedCommand,
    UnsupportedForward,
}

impl Error {
    /// I/O and protocol errors have no reliable way to reach the client;
    /// everything else becomes an ERR packet that keeps the connection
    /// alive.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Protocol(_))
    }

    /// The (code, sql_state, message) triple for an ERR packet, for the
    /// non-fatal variants.
    pub fn as_err_triple(&self) -> (u16, String, String) {
        match self {
            Error::Auth => (1044, "28000".to_string(), "Access denied".to_string()),
            Error::Driver {
                code,
                sql_state,
                message,
            } => (*code, sql_state.clone(), message.clone()),
            Error::Rule(message) => (1, "HY000".to_string(), message.clone()),
            Error::UnsupportedCommand => (
                1047,
                "08S01".to_string(),
                "command not supported".to_string(),
            ),
            Error::UnsupportedForward => (
                1235,
                "42000".to_string(),
                "No handle; cannot forward".to_string(),
            ),
            Error::Io(err) => (2000, "HY000".to_string(), err.to_string()),
            Error::Protocol(err) => (2000, "HY000".to_string(), err.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<wire::Error> for Error {
    fn from(err: wire::Error) -> Self {
        Error::Protocol(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => Display::fmt(err, f),
            Error::Protocol(err) => Display::fmt(err, f),
            Error::Auth => f.write_str("authentication failed"),
            Error::Driver { message, .. } => f.write_str(message),
            Error::Rule(message) => f.write_str(message),
            Error::UnsupportedCommand => f.write_str("command not supported"),
            Error::UnsupportedForward => f.write_str("no handle; cannot forward"),
        }
    }
}

impl std::error::Error for Error {}
