//! Protocol version 10 handshake: server greeting, client response parsing
//! and `mysql_native_password`-style scramble verification.
//! https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_v10.html

use crate::codec::*;
use crate::constants::*;
use crate::error::Error;
use rand::RngCore;
use sha1::{Digest, Sha1};
use std::collections::HashMap;

pub const SCRAMBLE_LEN: usize = 20;

pub const SERVER_VERSION_BANNER: &str = "8.0.0-rulewire";

/// Generates a fresh 20-byte scramble. Retained by the caller until the
/// client response is verified, then discarded.
pub fn generate_scramble() -> [u8; SCRAMBLE_LEN] {
    let mut scramble = [0_u8; SCRAMBLE_LEN];
    rand::thread_rng().fill_bytes(&mut scramble);
    scramble
}

/// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_v10.html
pub fn write_server_greeting(connection_id: u32, scramble: &[u8; SCRAMBLE_LEN], buffer: &mut Vec<u8>) {
    write_int_1(10, buffer); // protocol version
    write_null_string(SERVER_VERSION_BANNER, buffer);
    write_int_4(connection_id, buffer);
    write_fixed_bytes(&scramble[..8], buffer);
    write_int_1(0, buffer); // filler
    write_int_2(SERVER_CAPABILITIES as u16, buffer);
    write_int_1(CHARSET_UTF8_GENERAL_CI, buffer);
    write_int_2(STATUS_FLAG_AUTOCOMMIT, buffer);
    write_int_2((SERVER_CAPABILITIES >> 16) as u16, buffer);
    write_int_1((SCRAMBLE_LEN + 1) as u8, buffer); // auth-plugin-data-len: scramble plus its trailing NUL
    write_filler(10, buffer); // reserved
    write_fixed_bytes(&scramble[8..], buffer);
    write_int_1(0, buffer); // trailing NUL of the (fixed-length) scramble field
    write_null_string(AUTH_PLUGIN_NAME, buffer);
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub client_flags: u32,
    pub max_packet_size: u32,
    pub character_set: u8,
    pub username: String,
    pub auth_response: Vec<u8>,
    pub database: Option<String>,
}

impl HandshakeResponse {
    /// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_connection_phase_packets_protocol_handshake_response.html
    pub fn read(buffer: &[u8]) -> Result<Self, Error> {
        let (client_flags, rest) = read_int_4(buffer)?;
        let (max_packet_size, rest) = read_int_4(rest)?;
        let (character_set, rest) = read_int_1(rest)?;
        let (_filler, rest) = read_fixed_bytes(rest, 23)?;
        let (username, rest) = read_null_string(rest)?;

        let (auth_response, rest) = if client_flags & CAPABILITY_CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            read_lenenc_bytes(rest)?
        } else {
            let (len, rest) = read_int_1(rest)?;
            read_fixed_bytes(rest, len as usize)?
        };

        let (database, rest) = if client_flags & CAPABILITY_CLIENT_CONNECT_WITH_DB != 0 {
            let (db, rest) = read_null_string(rest)?;
            (Some(db), rest)
        } else {
            (None, rest)
        };
        let _ = rest; // plugin name / connect attrs, unused by this server

        Ok(HandshakeResponse {
            client_flags,
            max_packet_size,
            character_set,
            username,
            auth_response,
            database,
        })
    }
}

/// Computes `SHA1(password) XOR SHA1(scramble || SHA1(SHA1(password)))`,
/// the `mysql_native_password` response a well-behaved client sends back.
pub fn compute_scramble_response(password: &str, scramble: &[u8]) -> [u8; 20] {
    let pw_hash = Sha1::digest(password.as_bytes());
    let pw_hash_hash = Sha1::digest(&pw_hash);

    let mut ctx = Sha1::new();
    ctx.update(scramble);
    ctx.update(pw_hash_hash);
    let seed_hash = ctx.finalize();

    let mut out = [0_u8; 20];
    for i in 0..20 {
        out[i] = pw_hash[i] ^ seed_hash[i];
    }
    out
}

/// Does not short-circuit on the first mismatching byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0_u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// A pluggable authentication policy: given the username, the scramble
/// issued for this connection and the client's response, decide whether to
/// let the connection through. The default policy treats the
/// reference password as equal to the username.
pub trait AuthPolicy: Send + Sync {
    fn authenticate(&self, username: &str, scramble: &[u8], client_response: &[u8]) -> bool;
}

/// `mysql_native_password` against a fixed table of username -> password.
/// Falls back to "password equals username" for any user not listed,
/// matching the server's default stub policy.
pub struct PasswordTablePolicy {
    passwords: HashMap<String, String>,
}

impl PasswordTablePolicy {
    pub fn new(passwords: HashMap<String, String>) -> Self {
        PasswordTablePolicy { passwords }
    }
}

impl Default for PasswordTablePolicy {
    fn default() -> Self {
        PasswordTablePolicy::new(HashMap::new())
    }
}

impl AuthPolicy for PasswordTablePolicy {
    fn authenticate(&self, username: &str, scramble: &[u8], client_response: &[u8]) -> bool {
        let password = self
            .passwords
            .get(username)
            .map(String::as_str)
            .unwrap_or(username);
        let expected = compute_scramble_response(password, scramble);
        constant_time_eq(&expected, client_response)
    }
}
