//! The rule dispatcher: walks an ordered list of rules for each client
//! command, running whichever hooks are present until one of them
//! produces a terminal response.

use crate::conn::{ConnState, Dsn};
use crate::driver::QueryResult;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A rule slot that's either a fixed value supplied by configuration, or a
/// callable registered programmatically. Config files can only ever
/// produce `Literal` — JSON has no way to encode a closure — `Callable`
/// exists for embedding this crate as a library.
#[derive(Clone)]
pub enum HookValue<T> {
    Literal(T),
    Callable(Arc<dyn Fn(&str, &[String], &ConnState) -> T + Send + Sync>),
}

impl<T: Clone> HookValue<T> {
    pub fn resolve(&self, query: &str, captures: &[String], conn: &ConnState) -> T {
        match self {
            HookValue::Literal(value) => value.clone(),
            HookValue::Callable(f) => f(query, captures, conn),
        }
    }
}

impl<T> std::fmt::Debug for HookValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookValue::Literal(_) => f.write_str("HookValue::Literal(..)"),
            HookValue::Callable(_) => f.write_str("HookValue::Callable(..)"),
        }
    }
}

/// The `match` slot: a literal string that must equal the query exactly,
/// or a regex whose captures become positional arguments for later hooks.
pub enum MatchSpec {
    Literal(String),
    Regex(Regex),
}

impl MatchSpec {
    /// `Some(captures)` on a match (empty for a literal match), `None`
    /// otherwise.
    pub fn matches(&self, query: &str) -> Option<Vec<String>> {
        match self {
            MatchSpec::Literal(expected) => {
                if expected == query {
                    Some(Vec::new())
                } else {
                    None
                }
            }
            MatchSpec::Regex(re) => re.captures(query).map(|caps| {
                caps.iter()
                    .skip(1)
                    .map(|g| g.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            }),
        }
    }
}

/// What the `ok` hook resolved to.
#[derive(Debug, Clone)]
pub enum OkValue {
    /// A truthy/falsy scalar: truthy sends a bare OK, falsy does nothing.
    Bare(bool),
    Detailed {
        message: String,
        affected_rows: u64,
        insert_id: u64,
        warnings: u16,
    },
}

/// What the `data` hook resolved to.
#[derive(Debug, Clone)]
pub enum DataValue {
    Scalar(String),
    Flat(Vec<String>),
    Rows(Vec<Vec<String>>),
    Mapping(BTreeMap<String, String>),
}

/// A single dispatch rule. Every hook slot is optional;
/// absence means "skip this step".
#[derive(Default)]
pub struct Rule {
    pub command: Option<HookValue<u8>>,
    pub match_spec: Option<MatchSpec>,
    pub before: Option<HookValue<Result<(), String>>>,
    pub rewrite: Option<HookValue<String>>,
    pub dsn: Option<HookValue<Dsn>>,
    /// Marks that the rule carries a pre-opened handle of its own; only
    /// its presence matters for forward eligibility.
    pub dbh: bool,
    pub error: Option<HookValue<Option<(String, u16, String)>>>,
    pub ok: Option<HookValue<OkValue>>,
    pub columns: Option<HookValue<Vec<String>>>,
    pub data: Option<HookValue<DataValue>>,
    pub after: Option<HookValue<()>>,
    /// Marks the rule as eligible to forward even without `dbh`/`dsn`.
    pub forward: bool,
}

impl Rule {
    pub fn new() -> Self {
        Rule::default()
    }
}

/// What the dispatcher decided to send back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok {
        affected_rows: u64,
        last_insert_id: u64,
        warnings: u16,
        message: String,
    },
    Err {
        code: u16,
        sql_state: String,
        message: String,
    },
    ResultSet {
        columns: Vec<String>,
        rows: Vec<Vec<Option<String>>>,
    },
}

impl Response {
    fn bare_ok() -> Self {
        Response::Ok {
            affected_rows: 0,
            last_insert_id: 0,
            warnings: 0,
            message: String::new(),
        }
    }
}

fn data_to_columns_and_rows(columns: Vec<String>, data: DataValue) -> (Vec<String>, Vec<Vec<Option<String>>>) {
    match data {
        DataValue::Mapping(map) => {
            let rows = map
                .into_iter()
                .map(|(k, v)| vec![Some(k), Some(v)])
                .collect();
            let columns = if columns.is_empty() {
                vec!["key".to_string(), "value".to_string()]
            } else {
                columns
            };
            (columns, rows)
        }
        DataValue::Flat(values) => {
            let rows = values.into_iter().map(|v| vec![Some(v)]).collect();
            let columns = if columns.is_empty() {
                vec!["0".to_string()]
            } else {
                columns
            };
            (columns, rows)
        }
        DataValue::Rows(rows) => {
            let width = rows.first().map(Vec::len).unwrap_or(0);
            let columns = if columns.is_empty() {
                (0..width).map(|i| i.to_string()).collect()
            } else {
                columns
            };
            let rows = rows
                .into_iter()
                .map(|row| row.into_iter().map(Some).collect())
                .collect();
            (columns, rows)
        }
        DataValue::Scalar(value) => {
            let columns = if columns.is_empty() {
                vec!["0".to_string()]
            } else {
                columns
            };
            (columns, vec![vec![Some(value)]])
        }
    }
}

/// Runs a client command through the rule list, producing
/// exactly one terminal `Response` unless every gate rejects every rule
/// and there's no `forward`-eligible rule left, in which case the caller
/// gets `Error::UnsupportedCommand` (see `dispatch`).
pub fn dispatch<F>(
    rules: &[Rule],
    command_tag: u8,
    query: &str,
    conn: &ConnState,
    mut forward: F,
) -> Option<Response>
where
    F: FnMut(&str) -> Response,
{
    conn.data_sent.set(false);
    let last_index = rules.len().saturating_sub(1);

    for (index, rule) in rules.iter().enumerate() {
        if let Some(command_hook) = &rule.command {
            if command_hook.resolve(query, &[], conn) != command_tag {
                continue;
            }
        }

        let captures = match &rule.match_spec {
            Some(spec) => match spec.matches(query) {
                Some(captures) => captures,
                None => continue,
            },
            None => Vec::new(),
        };

        let mut response: Option<Response> = None;
        let mut forwarded_query = query.to_string();

        if let Some(before) = &rule.before {
            if let Err(message) = before.resolve(query, &captures, conn) {
                response = Some(Response::Err {
                    code: 1,
                    sql_state: "HY000".to_string(),
                    message,
                });
            }
        }

        if response.is_none() {
            if let Some(rewrite) = &rule.rewrite {
                forwarded_query = rewrite.resolve(query, &captures, conn);
            } else if matches!(&rule.match_spec, Some(MatchSpec::Regex(_))) {
                if let Some(first_capture) = captures.first() {
                    forwarded_query = first_capture.clone();
                }
            }

            if let Some(error_hook) = &rule.error {
                if let Some((message, code, sql_state)) = error_hook.resolve(query, &captures, conn) {
                    response = Some(Response::Err {
                        code,
                        sql_state,
                        message,
                    });
                }
            }
        }

        if response.is_none() {
            if let Some(ok_hook) = &rule.ok {
                match ok_hook.resolve(query, &captures, conn) {
                    OkValue::Bare(true) => response = Some(Response::bare_ok()),
                    OkValue::Bare(false) => {}
                    OkValue::Detailed {
                        message,
                        affected_rows,
                        insert_id,
                        warnings,
                    } => {
                        response = Some(Response::Ok {
                            affected_rows,
                            last_insert_id: insert_id,
                            warnings,
                            message,
                        })
                    }
                }
            }
        }

        let mut columns = Vec::new();
        let mut have_columns = false;
        if response.is_none() {
            if let Some(columns_hook) = &rule.columns {
                columns = columns_hook.resolve(query, &captures, conn);
                have_columns = true;
            }
            if let Some(data_hook) = &rule.data {
                let data = data_hook.resolve(query, &captures, conn);
                let (columns, rows) = data_to_columns_and_rows(columns, data);
                response = Some(Response::ResultSet { columns, rows });
            } else if have_columns {
                response = Some(Response::ResultSet {
                    columns,
                    rows: Vec::new(),
                });
            }
        }

        if response.is_none() {
            let forward_eligible = rule.dbh || rule.dsn.is_some() || rule.forward || index == last_index;
            if forward_eligible {
                if let Some(dsn_hook) = &rule.dsn {
                    let dsn = dsn_hook.resolve(query, &captures, conn);
                    if let Err(err) = conn.connect(&dsn) {
                        let (code, sql_state, message) = err.as_err_triple();
                        response = Some(Response::Err {
                            code,
                            sql_state,
                            message,
                        });
                    }
                }
                if response.is_none() {
                    if conn.has_handle() {
                        response = Some(forward(&forwarded_query));
                    } else {
                        response = Some(Response::Err {
                            code: 1235,
                            sql_state: "42000".to_string(),
                            message: "No handle; cannot forward".to_string(),
                        });
                    }
                }
            }
        }

        if let Some(after) = &rule.after {
            after.resolve(query, &captures, conn);
        }

        if let Some(response) = response {
            conn.data_sent.set(true);
            return Some(response);
        }
    }

    None
}

/// Turns a driver `QueryResult` into the dispatcher's `Response`
/// vocabulary.
pub fn response_from_query_result(result: QueryResult) -> Response {
    if result.columns.is_empty() {
        Response::Ok {
            affected_rows: result.affected_rows,
            last_insert_id: result.last_insert_id,
            warnings: 0,
            message: String::new(),
        }
    } else {
        Response::ResultSet {
            columns: result.columns.into_iter().map(|c| c.name).collect(),
            rows: result.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{NullDriver, SqlHandle};
    use std::sync::Arc as StdArc;

    fn new_conn() -> ConnState {
        ConnState::new("127.0.0.1".into(), StdArc::new(NullDriver), None, None)
    }

    struct EchoHandle;
    impl SqlHandle for EchoHandle {
        fn try_clone(&self) -> Result<Box<dyn SqlHandle>, crate::error::Error> {
            Ok(Box::new(EchoHandle))
        }
        fn execute(&mut self, _query: &str) -> Result<QueryResult, crate::error::Error> {
            Ok(QueryResult::default())
        }
    }

    struct EchoDriver;
    impl crate::driver::SqlDriver for EchoDriver {
        fn open(
            &self,
            _dsn: &str,
            _user: &str,
            _password: &str,
        ) -> Result<Box<dyn SqlHandle>, crate::error::Error> {
            Ok(Box::new(EchoHandle))
        }
    }

    fn new_connected_conn() -> ConnState {
        ConnState::new("127.0.0.1".into(), StdArc::new(EchoDriver), None, None)
    }

    #[test]
    fn test_ping_like_rule_sends_bare_ok() {
        let mut rule = Rule::new();
        rule.command = Some(HookValue::Literal(3));
        rule.match_spec = Some(MatchSpec::Literal("hello".to_string()));
        rule.data = Some(HookValue::Literal(DataValue::Flat(vec!["world".to_string()])));
        let rules = vec![rule];
        let conn = new_conn();

        let response = dispatch(&rules, 3, "hello", &conn, |_| unreachable!()).unwrap();
        assert_eq!(
            response,
            Response::ResultSet {
                columns: vec!["0".to_string()],
                rows: vec![vec![Some("world".to_string())]],
            }
        );
    }

    #[test]
    fn test_literal_match_ok_rule() {
        let mut rule = Rule::new();
        rule.command = Some(HookValue::Literal(3));
        rule.match_spec = Some(MatchSpec::Literal("SET SQL_AUTO_IS_NULL=0;".to_string()));
        rule.ok = Some(HookValue::Literal(OkValue::Bare(true)));
        let rules = vec![rule];
        let conn = new_conn();

        let response = dispatch(&rules, 3, "SET SQL_AUTO_IS_NULL=0;", &conn, |_| unreachable!()).unwrap();
        assert_eq!(response, Response::bare_ok());
    }

    #[test]
    fn test_no_handle_forward_errors() {
        let rules = vec![Rule::new()];
        let conn = new_conn();
        let response = dispatch(&rules, 3, "SELECT 1", &conn, |_| unreachable!()).unwrap();
        assert_eq!(
            response,
            Response::Err {
                code: 1235,
                sql_state: "42000".to_string(),
                message: "No handle; cannot forward".to_string(),
            }
        );
    }

    #[test]
    fn test_mapping_data_sorted_by_key() {
        let mut rule = Rule::new();
        let mut mapping = BTreeMap::new();
        mapping.insert("b".to_string(), "2".to_string());
        mapping.insert("a".to_string(), "1".to_string());
        rule.data = Some(HookValue::Literal(DataValue::Mapping(mapping)));
        let rules = vec![rule];
        let conn = new_conn();

        let response = dispatch(&rules, 3, "anything", &conn, |_| unreachable!()).unwrap();
        assert_eq!(
            response,
            Response::ResultSet {
                columns: vec!["key".to_string(), "value".to_string()],
                rows: vec![
                    vec![Some("a".to_string()), Some("1".to_string())],
                    vec![Some("b".to_string()), Some("2".to_string())],
                ],
            }
        );
    }

    #[test]
    fn test_regex_match_default_rewrite_uses_first_capture() {
        let mut rule = Rule::new();
        rule.match_spec = Some(MatchSpec::Regex(Regex::new("^USE (\\w+)$").unwrap()));
        rule.forward = true;
        let rules = vec![rule];
        let conn = new_connected_conn();
        conn.connect(&Dsn::default()).unwrap();

        let response = dispatch(&rules, 3, "USE mydb", &conn, |forwarded| {
            assert_eq!(forwarded, "mydb");
            Response::bare_ok()
        });
        assert_eq!(response, Some(Response::bare_ok()));
    }

    #[test]
    fn test_error_hook_wins_over_ok() {
        let mut rule = Rule::new();
        rule.error = Some(HookValue::Literal(Some((
            "nope".to_string(),
            1146,
            "42S02".to_string(),
        ))));
        rule.ok = Some(HookValue::Literal(OkValue::Bare(true)));
        let rules = vec![rule];
        let conn = new_conn();

        let response = dispatch(&rules, 3, "anything", &conn, |_| unreachable!()).unwrap();
        assert_eq!(
            response,
            Response::Err {
                code: 1146,
                sql_state: "42S02".to_string(),
                message: "nope".to_string(),
            }
        );
    }

    #[test]
    fn test_rule_that_sets_nothing_falls_through_to_next() {
        let passthrough = Rule::new();
        let mut terminal = Rule::new();
        terminal.ok = Some(HookValue::Literal(OkValue::Bare(true)));
        let rules = vec![passthrough, terminal];
        let conn = new_conn();

        let response = dispatch(&rules, 3, "anything", &conn, |_| unreachable!()).unwrap();
        assert_eq!(response, Response::bare_ok());
    }

    #[test]
    fn test_callable_hook_receives_captures() {
        let mut rule = Rule::new();
        rule.match_spec = Some(MatchSpec::Regex(Regex::new("^echo (\\w+)$").unwrap()));
        rule.data = Some(HookValue::Callable(StdArc::new(|_q, captures, _conn| {
            DataValue::Scalar(captures[0].clone())
        })));
        let rules = vec![rule];
        let conn = new_conn();

        let response = dispatch(&rules, 3, "echo hi", &conn, |_| unreachable!()).unwrap();
        assert_eq!(
            response,
            Response::ResultSet {
                columns: vec!["0".to_string()],
                rows: vec![vec![Some("hi".to_string())]],
            }
        );
    }
}
