//! The MySQL client/server wire protocol: packet framing, the primitive
//! type codec, the version-10 handshake and the command/response packet
//! shapes of the text protocol. This crate knows nothing about rules,
//! drivers or dispatch — it only speaks bytes.

pub mod codec;
pub mod constants;
pub mod error;
pub mod framer;
pub mod handshake;
pub mod packets;

pub use error::Error;
pub use framer::PacketFramer;
