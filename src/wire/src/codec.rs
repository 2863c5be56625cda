//! Encoding and decoding of the MySQL wire primitives: fixed-width little
//! endian integers, length-encoded integers/strings, null-terminated
//! strings and fixed-length byte runs.
//!
//! Write functions append to a `Vec<u8>`. Read functions consume a prefix
//! of the slice they're given and hand back what's left, so callers chain
//! them the same way the original packet readers do; they return
//! `Err(Error::MalformedPacket(..))` rather than panicking when a declared
//! length runs past the end of the buffer.

use crate::error::Error;
use std::convert::TryInto;

fn take(buffer: &[u8], n: usize) -> Result<(&[u8], &[u8]), Error> {
    if n > buffer.len() {
        return Err(Error::MalformedPacket(format!(
            "wanted {} bytes, only {} remain",
            n,
            buffer.len()
        )));
    }
    Ok((&buffer[..n], &buffer[n..]))
}

pub fn write_int_1(i: u8, buffer: &mut Vec<u8>) {
    buffer.push(i);
}

pub fn read_int_1(buffer: &[u8]) -> Result<(u8, &[u8]), Error> {
    let (head, rest) = take(buffer, 1)?;
    Ok((head[0], rest))
}

pub fn write_int_2(i: u16, buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(&i.to_le_bytes());
}

pub fn read_int_2(buffer: &[u8]) -> Result<(u16, &[u8]), Error> {
    let (head, rest) = take(buffer, 2)?;
    Ok((u16::from_le_bytes(head.try_into().unwrap()), rest))
}

pub fn write_int_3(i: u32, buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(&i.to_le_bytes()[..3]);
}

pub fn read_int_3(buffer: &[u8]) -> Result<(u32, &[u8]), Error> {
    let (head, rest) = take(buffer, 3)?;
    let mut buf = [0_u8; 4];
    buf[..3].copy_from_slice(head);
    Ok((u32::from_le_bytes(buf), rest))
}

pub fn write_int_4(i: u32, buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(&i.to_le_bytes());
}

pub fn read_int_4(buffer: &[u8]) -> Result<(u32, &[u8]), Error> {
    let (head, rest) = take(buffer, 4)?;
    Ok((u32::from_le_bytes(head.try_into().unwrap()), rest))
}

pub fn write_int_8(i: u64, buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(&i.to_le_bytes());
}

pub fn read_int_8(buffer: &[u8]) -> Result<(u64, &[u8]), Error> {
    let (head, rest) = take(buffer, 8)?;
    Ok((u64::from_le_bytes(head.try_into().unwrap()), rest))
}

/// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_dt_integers.html#sect_protocol_basic_dt_int_le
pub fn write_lenenc_int(i: u64, buffer: &mut Vec<u8>) {
    if i < 0xFB {
        buffer.push(i as u8);
    } else if i <= 0xFFFF {
        buffer.push(0xFC);
        write_int_2(i as u16, buffer);
    } else if i <= 0xFF_FFFF {
        buffer.push(0xFD);
        write_int_3(i as u32, buffer);
    } else {
        buffer.push(0xFE);
        write_int_8(i, buffer);
    }
}

pub fn read_lenenc_int(buffer: &[u8]) -> Result<(u64, &[u8]), Error> {
    let (tag, rest) = read_int_1(buffer)?;
    match tag {
        0xFB => Err(Error::MalformedPacket(
            "NULL sentinel where a length-encoded integer was expected".into(),
        )),
        0xFC => {
            let (i, rest) = read_int_2(rest)?;
            Ok((i as u64, rest))
        }
        0xFD => {
            let (i, rest) = read_int_3(rest)?;
            Ok((i as u64, rest))
        }
        0xFE => read_int_8(rest),
        b => Ok((b as u64, rest)),
    }
}

/// A length-encoded string; `None` renders as the bare `0xFB` NULL marker
/// used for row columns.
pub fn write_lenenc_string(s: Option<&str>, buffer: &mut Vec<u8>) {
    match s {
        None => buffer.push(0xFB),
        Some(s) => {
            write_lenenc_int(s.len() as u64, buffer);
            buffer.extend_from_slice(s.as_bytes());
        }
    }
}

pub fn read_lenenc_string(buffer: &[u8]) -> Result<(Option<String>, &[u8]), Error> {
    if buffer.first() == Some(&0xFB) {
        return Ok((None, &buffer[1..]));
    }
    let (len, rest) = read_lenenc_int(buffer)?;
    let (bytes, rest) = take(rest, len as usize)?;
    Ok((Some(String::from_utf8_lossy(bytes).into_owned()), rest))
}

pub fn write_lenenc_bytes(b: &[u8], buffer: &mut Vec<u8>) {
    write_lenenc_int(b.len() as u64, buffer);
    buffer.extend_from_slice(b);
}

pub fn read_lenenc_bytes(buffer: &[u8]) -> Result<(Vec<u8>, &[u8]), Error> {
    let (len, rest) = read_lenenc_int(buffer)?;
    let (bytes, rest) = take(rest, len as usize)?;
    Ok((bytes.to_vec(), rest))
}

pub fn write_null_string(s: &str, buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(s.as_bytes());
    buffer.push(0);
}

pub fn read_null_string(buffer: &[u8]) -> Result<(String, &[u8]), Error> {
    let nul = buffer
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| Error::MalformedPacket("missing NUL terminator".into()))?;
    Ok((
        String::from_utf8_lossy(&buffer[..nul]).into_owned(),
        &buffer[nul + 1..],
    ))
}

pub fn write_fixed_bytes(b: &[u8], buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(b);
}

pub fn read_fixed_bytes(buffer: &[u8], len: usize) -> Result<(Vec<u8>, &[u8]), Error> {
    let (bytes, rest) = take(buffer, len)?;
    Ok((bytes.to_vec(), rest))
}

pub fn read_fixed_string(buffer: &[u8], len: usize) -> Result<(String, &[u8]), Error> {
    let (bytes, rest) = take(buffer, len)?;
    Ok((String::from_utf8_lossy(bytes).into_owned(), rest))
}

/// A filler of `n` zero bytes, used for the handshake response's reserved
/// region and similar padding.
pub fn write_filler(n: usize, buffer: &mut Vec<u8>) {
    buffer.resize(buffer.len() + n, 0);
}

/// Consumes the remainder of the payload as a UTF-8 string (e.g. the query
/// text of a COM_QUERY packet, which has no length prefix of its own).
pub fn read_eof_string(buffer: &[u8]) -> String {
    String::from_utf8_lossy(buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_roundtrip() {
        let mut buf = vec![];
        write_int_1(0xAB, &mut buf);
        write_int_2(0xCDEF, &mut buf);
        write_int_3(0x00AB_CDEF, &mut buf);
        write_int_4(0xDEAD_BEEF, &mut buf);
        write_int_8(0x0123_4567_89AB_CDEF, &mut buf);

        let (a, rest) = read_int_1(&buf).unwrap();
        let (b, rest) = read_int_2(rest).unwrap();
        let (c, rest) = read_int_3(rest).unwrap();
        let (d, rest) = read_int_4(rest).unwrap();
        let (e, rest) = read_int_8(rest).unwrap();
        assert_eq!(a, 0xAB);
        assert_eq!(b, 0xCDEF);
        assert_eq!(c, 0x00AB_CDEF);
        assert_eq!(d, 0xDEAD_BEEF);
        assert_eq!(e, 0x0123_4567_89AB_CDEF);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_lenenc_int_roundtrip() {
        for value in [
            0_u64,
            0xFA,
            0xFB,
            0xFFFF,
            0x1_0000,
            0xFF_FFFF,
            0x100_0000,
            (1_u64 << 63) - 1,
        ] {
            let mut buf = vec![];
            write_lenenc_int(value, &mut buf);
            let (decoded, rest) = read_lenenc_int(&buf).unwrap();
            assert_eq!(decoded, value);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn test_lenenc_int_encoding_boundaries() {
        let mut buf = vec![];
        write_lenenc_int(250, &mut buf);
        assert_eq!(buf, vec![250]);

        let mut buf = vec![];
        write_lenenc_int(0xFFFF, &mut buf);
        assert_eq!(buf[0], 0xFC);

        let mut buf = vec![];
        write_lenenc_int(0x1_0000, &mut buf);
        assert_eq!(buf[0], 0xFD);

        let mut buf = vec![];
        write_lenenc_int(0x100_0000, &mut buf);
        assert_eq!(buf[0], 0xFE);
    }

    #[test]
    fn test_lenenc_string_null() {
        let mut buf = vec![];
        write_lenenc_string(None, &mut buf);
        assert_eq!(buf, vec![0xFB]);
        let (decoded, rest) = read_lenenc_string(&buf).unwrap();
        assert_eq!(decoded, None);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_lenenc_string_value() {
        let mut buf = vec![];
        write_lenenc_string(Some("hello"), &mut buf);
        let (decoded, rest) = read_lenenc_string(&buf).unwrap();
        assert_eq!(decoded, Some("hello".to_string()));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_null_string_roundtrip() {
        let mut buf = vec![];
        write_null_string("incresql-ish", &mut buf);
        buf.push(0x42); // trailing byte belonging to a later field
        let (decoded, rest) = read_null_string(&buf).unwrap();
        assert_eq!(decoded, "incresql-ish");
        assert_eq!(rest, &[0x42]);
    }

    #[test]
    fn test_malformed_length_is_an_error() {
        // Claims an 8-byte string but only provides 2.
        let buf = [0x08, 0x00, 0x00];
        assert!(read_lenenc_string(&buf).is_err());
    }
}
