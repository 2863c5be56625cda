//! The packet layer: a 3-byte little-endian length, a 1-byte sequence
//! number, and a payload. A payload of exactly 0xFFFFFF bytes is followed
//! by a continuation packet; the framer concatenates on read, but never
//! needs to split on write since every packet this server sends is small.
//! https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_packets.html

use crate::codec::{read_int_3, write_int_3};
use crate::error::Error;
use std::io::{Read, Write};

const MAX_PAYLOAD_LEN: usize = 0x00FF_FFFF;

pub struct PacketFramer<S> {
    stream: S,
    sequence: u8,
}

impl<S> PacketFramer<S> {
    pub fn new(stream: S) -> Self {
        PacketFramer { stream, sequence: 0 }
    }

    /// Resets the expected/outbound sequence to 0. Called at the start of
    /// every client-initiated command cycle.
    pub fn reset_sequence(&mut self) {
        self.sequence = 0;
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read> PacketFramer<S> {
    /// Reads one logical packet, validating the sequence number on each
    /// physical chunk against the server's expected next value and
    /// concatenating split (>= 0xFFFFFF byte) chunks.
    pub fn read_packet(&mut self) -> Result<Vec<u8>, Error> {
        let mut payload = Vec::new();
        loop {
            let mut header = [0_u8; 4];
            self.stream.read_exact(&mut header)?;
            let (len, seq_byte) = read_int_3(&header)?;
            let actual_seq = seq_byte[0];

            if actual_seq != self.sequence {
                return Err(Error::UnexpectedSequence {
                    expected: self.sequence,
                    actual: actual_seq,
                });
            }
            self.sequence = self.sequence.wrapping_add(1);

            let mut chunk = vec![0_u8; len as usize];
            self.stream.read_exact(&mut chunk)?;
            let is_final = (len as usize) < MAX_PAYLOAD_LEN;
            payload.extend_from_slice(&chunk);

            if is_final {
                break;
            }
        }
        Ok(payload)
    }
}

impl<S: Write> PacketFramer<S> {
    /// Writes one logical packet, splitting into 0xFFFFFF-sized chunks if
    /// necessary (never required for this server's own responses, but
    /// implemented for completeness and so tests can exercise it).
    pub fn write_packet(&mut self, payload: &[u8]) -> Result<(), Error> {
        let mut remaining = payload;
        loop {
            let chunk_len = remaining.len().min(MAX_PAYLOAD_LEN);
            let mut header = Vec::with_capacity(4);
            write_int_3(chunk_len as u32, &mut header);
            header.push(self.sequence);
            self.stream.write_all(&header)?;
            self.stream.write_all(&remaining[..chunk_len])?;
            self.sequence = self.sequence.wrapping_add(1);

            remaining = &remaining[chunk_len..];
            if chunk_len < MAX_PAYLOAD_LEN {
                break;
            }
        }
        self.stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip_small_packet() {
        let mut buf = Vec::new();
        {
            let mut framer = PacketFramer::new(&mut buf);
            framer.write_packet(b"hello").unwrap();
        }
        let mut framer = PacketFramer::new(Cursor::new(buf));
        let payload = framer.read_packet().unwrap();
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn test_sequence_increments_per_command_cycle() {
        let mut buf = Vec::new();
        {
            let mut framer = PacketFramer::new(&mut buf);
            framer.write_packet(b"one").unwrap();
            framer.write_packet(b"two").unwrap();
        }
        // second packet's sequence byte is 1
        assert_eq!(buf[3], 0);
        assert_eq!(buf[4 + 3 + 3], 1);
    }

    #[test]
    fn test_reset_sequence_restarts_at_zero() {
        let mut buf = Vec::new();
        {
            let mut framer = PacketFramer::new(&mut buf);
            framer.write_packet(b"one").unwrap();
            framer.reset_sequence();
            framer.write_packet(b"two").unwrap();
        }
        assert_eq!(buf[3], 0);
        assert_eq!(buf[4 + 3 + 3], 0);
    }

    #[test]
    fn test_unexpected_sequence_is_protocol_error() {
        // header claims sequence 5 when the framer expects 0.
        let raw = [0x01, 0x00, 0x00, 0x05, 0xAB];
        let mut framer = PacketFramer::new(Cursor::new(raw));
        match framer.read_packet() {
            Err(Error::UnexpectedSequence { expected: 0, actual: 5 }) => {}
            other => panic!("expected UnexpectedSequence, got {:?}", other),
        }
    }

    #[test]
    fn test_short_read_before_full_header() {
        let raw = [0x05, 0x00];
        let mut framer = PacketFramer::new(Cursor::new(raw));
        match framer.read_packet() {
            Err(Error::ShortRead) => {}
            other => panic!("expected ShortRead, got {:?}", other),
        }
    }

    #[test]
    fn test_split_packet_recombines() {
        let payload = vec![0x42_u8; MAX_PAYLOAD_LEN + 10];
        let mut buf = Vec::new();
        {
            let mut framer = PacketFramer::new(&mut buf);
            framer.write_packet(&payload).unwrap();
        }
        let mut framer = PacketFramer::new(Cursor::new(buf));
        let decoded = framer.read_packet().unwrap();
        assert_eq!(decoded, payload);
    }
}
