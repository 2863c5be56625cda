use std::fmt::{Display, Formatter};

/// Errors raised by the framer and codec. These never carry enough context
/// to build a client-facing ERR packet on their own; per the propagation
/// policy they terminate the connection.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// EOF before a full header or payload was read.
    ShortRead,
    /// The client sent a sequence number other than the one the framer
    /// expected next.
    UnexpectedSequence { expected: u8, actual: u8 },
    /// A declared length-encoded value exceeded the bytes remaining in the
    /// containing payload.
    MalformedPacket(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::ShortRead
        } else {
            Error::Io(err)
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => Display::fmt(err, f),
            Error::ShortRead => f.write_str("short read: connection closed mid-packet"),
            Error::UnexpectedSequence { expected, actual } => f.write_fmt(format_args!(
                "unexpected packet sequence number: expected {} got {}",
                expected, actual
            )),
            Error::MalformedPacket(msg) => f.write_fmt(format_args!("malformed packet: {}", msg)),
        }
    }
}

impl std::error::Error for Error {}
