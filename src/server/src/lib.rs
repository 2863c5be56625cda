//! The connection orchestrator: one `TcpListener` accept loop, a thread per
//! client, and per-connection glue between the packet framer, the
//! handshake and the rule dispatcher.

use dispatch::driver::SqlDriver;
use dispatch::rules::{dispatch as run_rules, response_from_query_result, Response, Rule};
use dispatch::{ConnState, Dsn};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use wire::constants::*;
use wire::error::Error as WireError;
use wire::handshake::{self, AuthPolicy, PasswordTablePolicy};
use wire::packets::{self, Command};
use wire::PacketFramer;

/// Everything a freshly-accepted connection needs that doesn't change
/// between connections: the rule list, the driver and the default DSNs.
pub struct ServerConfig {
    pub rules: Arc<Vec<Rule>>,
    pub driver: Arc<dyn SqlDriver>,
    pub default_dsn: Option<Dsn>,
    pub remote_dsn: Option<Dsn>,
    pub auth_policy: Arc<dyn AuthPolicy>,
}

impl ServerConfig {
    pub fn new(rules: Vec<Rule>, driver: Arc<dyn SqlDriver>) -> Self {
        ServerConfig {
            rules: Arc::new(rules),
            driver,
            default_dsn: None,
            remote_dsn: None,
            auth_policy: Arc::new(PasswordTablePolicy::default()),
        }
    }
}

pub struct Server {
    config: Arc<ServerConfig>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Server {
            config: Arc::new(config),
        }
    }

    pub fn listen(&mut self, addr: &str) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr)?;
        let mut connection_id: u32 = 1;
        loop {
            let (stream, peer) = listener.accept()?;
            let config = Arc::clone(&self.config);
            let id = connection_id;
            connection_id = connection_id.wrapping_add(1);
            let remote_host = peer.ip().to_string();
            thread::spawn(move || {
                if let Err(err) = handle_connection(stream, id, remote_host, config) {
                    log::warn!("connection {} terminated: {}", id, err);
                }
            });
        }
    }
}

fn handle_connection(
    stream: TcpStream,
    connection_id: u32,
    remote_host: String,
    config: Arc<ServerConfig>,
) -> Result<(), WireError> {
    let mut framer = PacketFramer::new(stream);

    let username = match do_handshake(&mut framer, connection_id, config.auth_policy.as_ref()) {
        Ok(username) => username,
        Err(AuthOutcome::Protocol(err)) => return Err(err),
        Err(AuthOutcome::Denied) => {
            framer.reset_sequence();
            let mut buf = Vec::new();
            packets::write_err_packet(1044, "28000", "Access denied", &mut buf);
            framer.write_packet(&buf)?;
            return Ok(());
        }
    };

    let conn = ConnState::new(
        remote_host,
        Arc::clone(&config.driver),
        config.default_dsn.clone(),
        config.remote_dsn.clone(),
    );
    *conn.username.borrow_mut() = username;

    loop {
        framer.reset_sequence();
        let payload = framer.read_packet()?;
        let command = Command::read(&payload)?;

        match command {
            Command::Quit => break,
            Command::Ping => send_response(&mut framer, Response::Ok {
                affected_rows: 0,
                last_insert_id: 0,
                warnings: 0,
                message: String::new(),
            })?,
            Command::InitDb(schema) => {
                *conn.database.borrow_mut() = Some(schema);
                send_response(&mut framer, Response::Ok {
                    affected_rows: 0,
                    last_insert_id: 0,
                    warnings: 0,
                    message: String::new(),
                })?;
            }
            Command::Query(query) => {
                // No rule list entry ever terminating the walk (including
                // the degenerate empty-rules case) falls back to a forward
                // attempt, not ER_UNKNOWN_COM_ERROR: that code is reserved
                // for command bytes the server doesn't recognize at all.
                let response = run_rules(&config.rules, COM_QUERY, &query, &conn, |forwarded| {
                    forward_query(&conn, forwarded)
                })
                .unwrap_or_else(|| forward_query(&conn, &query));
                send_response(&mut framer, response)?;
            }
            Command::FieldList(table) => {
                let response = run_rules(&config.rules, COM_FIELD_LIST, &table, &conn, |forwarded| {
                    forward_query(&conn, forwarded)
                })
                .unwrap_or_else(|| forward_query(&conn, &table));
                send_field_list_response(&mut framer, response)?;
            }
            Command::Unknown(_) => {
                let mut buf = Vec::new();
                packets::write_err_packet(1047, "08S01", "command not supported", &mut buf);
                framer.write_packet(&buf)?;
            }
        }
    }

    Ok(())
}

fn forward_query(conn: &ConnState, query: &str) -> Response {
    let result = conn.with_handle(|handle| handle.execute(query));
    match result {
        Some(Ok(result)) => response_from_query_result(result),
        Some(Err(err)) => {
            let (code, sql_state, message) = err.as_err_triple();
            Response::Err {
                code,
                sql_state,
                message,
            }
        }
        None => Response::Err {
            code: 1235,
            sql_state: "42000".to_string(),
            message: "No handle; cannot forward".to_string(),
        },
    }
}

fn send_response(framer: &mut PacketFramer<TcpStream>, response: Response) -> Result<(), WireError> {
    match response {
        Response::Ok {
            affected_rows,
            last_insert_id,
            warnings,
            message,
        } => {
            let mut buf = Vec::new();
            packets::write_ok_packet(affected_rows, last_insert_id, warnings, &message, &mut buf);
            framer.write_packet(&buf)?;
        }
        Response::Err {
            code,
            sql_state,
            message,
        } => {
            let mut buf = Vec::new();
            packets::write_err_packet(code, &sql_state, &message, &mut buf);
            framer.write_packet(&buf)?;
        }
        Response::ResultSet { columns, rows } => {
            let mut buf = Vec::new();
            packets::write_resultset_header(columns.len(), &mut buf);
            framer.write_packet(&buf)?;

            for name in &columns {
                let mut buf = Vec::new();
                packets::ColumnDefinition::named(name).write(&mut buf);
                framer.write_packet(&buf)?;
            }

            let mut buf = Vec::new();
            packets::write_eof_packet(0, &mut buf);
            framer.write_packet(&buf)?;

            for row in &rows {
                let mut buf = Vec::new();
                packets::write_row_packet(row, &mut buf);
                framer.write_packet(&buf)?;
            }

            let mut buf = Vec::new();
            packets::write_eof_packet(0, &mut buf);
            framer.write_packet(&buf)?;
        }
    }
    Ok(())
}

/// FIELD_LIST has its own reply shape: column definitions terminated by
/// EOF, with no leading column-count packet and no rows.
fn send_field_list_response(framer: &mut PacketFramer<TcpStream>, response: Response) -> Result<(), WireError> {
    match response {
        Response::ResultSet { columns, .. } => {
            for name in &columns {
                let mut buf = Vec::new();
                packets::ColumnDefinition::named(name).write(&mut buf);
                framer.write_packet(&buf)?;
            }
            let mut buf = Vec::new();
            packets::write_eof_packet(0, &mut buf);
            framer.write_packet(&buf)?;
            Ok(())
        }
        other => send_response(framer, other),
    }
}

enum AuthOutcome {
    Protocol(WireError),
    Denied,
}

impl From<WireError> for AuthOutcome {
    fn from(err: WireError) -> Self {
        AuthOutcome::Protocol(err)
    }
}

fn do_handshake(
    framer: &mut PacketFramer<TcpStream>,
    connection_id: u32,
    auth_policy: &dyn AuthPolicy,
) -> Result<String, AuthOutcome> {
    let scramble = handshake::generate_scramble();
    let mut buf = Vec::new();
    handshake::write_server_greeting(connection_id, &scramble, &mut buf);
    framer.write_packet(&buf)?;

    let payload = framer.read_packet()?;
    let response = handshake::HandshakeResponse::read(&payload)?;

    if !auth_policy.authenticate(&response.username, &scramble, &response.auth_response) {
        return Err(AuthOutcome::Denied);
    }

    let mut buf = Vec::new();
    packets::write_ok_packet(0, 0, 0, "", &mut buf);
    framer.write_packet(&buf)?;

    Ok(response.username)
}
