//! End-to-end scenarios driven against a real `server::Server` over an
//! actual TCP socket, using the `mysql` crate as a real client the same
//! way `benchmarking/_tpch/mysql_runner.rs` drives a live MySQL server.

use dispatch::driver::NullDriver;
use dispatch::rules::{DataValue, HookValue, MatchSpec, OkValue, Rule};
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder};
use server::{Server, ServerConfig};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn spawn_server(rules: Vec<Rule>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ServerConfig::new(rules, Arc::new(NullDriver));
    thread::spawn(move || {
        let mut server = Server::new(config);
        server.listen(&format!("127.0.0.1:{}", port)).unwrap();
    });

    // Give the accept loop a moment to bind before the client connects.
    thread::sleep(Duration::from_millis(100));
    port
}

fn connect(port: u16, user: &str, password: &str) -> mysql::Result<Conn> {
    let opts = OptsBuilder::new()
        .ip_or_hostname(Some("127.0.0.1"))
        .tcp_port(port)
        .user(Some(user))
        .pass(Some(password));
    Conn::new(opts)
}

#[test]
fn scenario_ping_returns_ok() {
    let port = spawn_server(Vec::new());
    let mut conn = connect(port, "myuser", "myuser").unwrap();
    assert!(conn.ping());
}

#[test]
fn scenario_auth_success_and_failure() {
    let port = spawn_server(Vec::new());
    assert!(connect(port, "myuser", "myuser").is_ok());
    assert!(connect(port, "myuser", "wrong").is_err());
}

#[test]
fn scenario_rule_produces_result_set() {
    let mut rule = Rule::new();
    rule.match_spec = Some(MatchSpec::Literal("hello".to_string()));
    rule.data = Some(HookValue::Literal(DataValue::Flat(vec!["world".to_string()])));

    let port = spawn_server(vec![rule]);
    let mut conn = connect(port, "myuser", "myuser").unwrap();
    let row: Option<String> = conn.query_first("hello").unwrap();
    assert_eq!(row, Some("world".to_string()));
}

#[test]
fn scenario_rule_produces_bare_ok() {
    let mut rule = Rule::new();
    rule.match_spec = Some(MatchSpec::Literal("SET SQL_AUTO_IS_NULL=0;".to_string()));
    rule.ok = Some(HookValue::Literal(OkValue::Bare(true)));

    let port = spawn_server(vec![rule]);
    let mut conn = connect(port, "myuser", "myuser").unwrap();
    conn.query_drop("SET SQL_AUTO_IS_NULL=0;").unwrap();
}

#[test]
fn scenario_no_handle_forward_errors() {
    let port = spawn_server(Vec::new());
    let mut conn = connect(port, "myuser", "myuser").unwrap();
    let result = conn.query_drop("SELECT 1");
    assert!(result.is_err());
}

#[test]
fn scenario_mapping_data_sorted_by_key() {
    let mut rule = Rule::new();
    let mut mapping = BTreeMap::new();
    mapping.insert("b".to_string(), "2".to_string());
    mapping.insert("a".to_string(), "1".to_string());
    rule.data = Some(HookValue::Literal(DataValue::Mapping(mapping)));

    let port = spawn_server(vec![rule]);
    let mut conn = connect(port, "myuser", "myuser").unwrap();
    let rows: Vec<(String, String)> = conn.query("anything").unwrap();
    assert_eq!(
        rows,
        vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]
    );
}
