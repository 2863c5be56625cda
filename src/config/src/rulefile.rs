//! JSON rule-file loading: each configured file is an array of rule
//! records, interpreted into the dispatcher's `Rule` shape. Regex match
//! specs are compiled eagerly so a malformed configuration fails at
//! startup rather than mid-connection. Every hook loaded this way is a
//! `HookValue::Literal` — `Callable` is reserved for embedding this crate
//! as a library.

use crate::error::Error;
use dispatch::rules::{DataValue, HookValue, MatchSpec, OkValue, Rule};
use dispatch::Dsn;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use wire::constants::{COM_FIELD_LIST, COM_INIT_DB, COM_PING, COM_QUERY, COM_QUIT};

#[derive(Deserialize)]
struct RuleFile {
    rules: Vec<RawRule>,
}

#[derive(Deserialize, Default)]
struct RawRule {
    command: Option<String>,
    #[serde(rename = "match")]
    match_spec: Option<RawMatch>,
    before: Option<String>,
    rewrite: Option<String>,
    dsn: Option<RawDsn>,
    #[serde(default)]
    dbh: bool,
    error: Option<RawError>,
    ok: Option<Value>,
    columns: Option<Vec<String>>,
    data: Option<Value>,
    #[serde(default)]
    forward: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMatch {
    Bare(String),
    Literal { literal: String },
    Regex { regex: String },
}

#[derive(Deserialize)]
struct RawDsn {
    dsn: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct RawError {
    message: String,
    code: u16,
    sql_state: String,
}

/// Parses a JSON rule file into an ordered `Vec<Rule>`.
pub fn load_rule_file(path: &str) -> Result<Vec<Rule>, Error> {
    let text = fs::read_to_string(path)?;
    let file: RuleFile = serde_json::from_str(&text)?;
    file.rules.into_iter().map(build_rule).collect()
}

fn command_tag(name: &str) -> Option<u8> {
    match name {
        "QUIT" => Some(COM_QUIT),
        "INIT_DB" => Some(COM_INIT_DB),
        "QUERY" => Some(COM_QUERY),
        "FIELD_LIST" => Some(COM_FIELD_LIST),
        "PING" => Some(COM_PING),
        _ => None,
    }
}

fn build_rule(raw: RawRule) -> Result<Rule, Error> {
    let mut rule = Rule::new();

    if let Some(name) = &raw.command {
        let tag = command_tag(name).unwrap_or(0xFF);
        rule.command = Some(HookValue::Literal(tag));
    }

    if let Some(match_spec) = raw.match_spec {
        rule.match_spec = Some(match match_spec {
            RawMatch::Bare(literal) => MatchSpec::Literal(literal),
            RawMatch::Literal { literal } => MatchSpec::Literal(literal),
            RawMatch::Regex { regex } => MatchSpec::Regex(regex::Regex::new(&regex)?),
        });
    }

    if let Some(message) = raw.before {
        // A config-file `before` hook can only ever fail with a fixed
        // message; callables that can succeed/fail dynamically are a
        // library-embedding concern.
        rule.before = Some(HookValue::Literal(Err(message)));
    }

    if let Some(rewrite) = raw.rewrite {
        rule.rewrite = Some(HookValue::Literal(rewrite));
    }

    if let Some(dsn) = raw.dsn {
        rule.dsn = Some(HookValue::Literal(Dsn {
            dsn: dsn.dsn,
            user: dsn.user,
            password: dsn.password,
        }));
    }

    rule.dbh = raw.dbh;

    if let Some(error) = raw.error {
        rule.error = Some(HookValue::Literal(Some((
            error.message,
            error.code,
            error.sql_state,
        ))));
    }

    if let Some(ok) = raw.ok {
        rule.ok = Some(HookValue::Literal(parse_ok_value(ok)?));
    }

    rule.columns = raw.columns.map(HookValue::Literal);

    if let Some(data) = raw.data {
        rule.data = Some(HookValue::Literal(parse_data_value(data)?));
    }

    rule.forward = raw.forward;

    Ok(rule)
}

fn parse_ok_value(value: Value) -> Result<OkValue, Error> {
    match value {
        Value::Bool(truthy) => Ok(OkValue::Bare(truthy)),
        Value::Object(map) => {
            let message = map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let affected_rows = map.get("affected_rows").and_then(Value::as_u64).unwrap_or(0);
            let insert_id = map.get("insert_id").and_then(Value::as_u64).unwrap_or(0);
            let warnings = map
                .get("warnings")
                .and_then(Value::as_u64)
                .unwrap_or(0) as u16;
            Ok(OkValue::Detailed {
                message,
                affected_rows,
                insert_id,
                warnings,
            })
        }
        other => Ok(OkValue::Bare(!other.is_null())),
    }
}

fn parse_data_value(value: Value) -> Result<DataValue, Error> {
    match value {
        Value::String(scalar) => Ok(DataValue::Scalar(scalar)),
        Value::Number(n) => Ok(DataValue::Scalar(n.to_string())),
        Value::Array(items) => {
            if items.iter().all(|item| !item.is_array()) {
                Ok(DataValue::Flat(items.into_iter().map(value_to_string).collect()))
            } else {
                Ok(DataValue::Rows(
                    items
                        .into_iter()
                        .map(|row| match row {
                            Value::Array(cells) => cells.into_iter().map(value_to_string).collect(),
                            other => vec![value_to_string(other)],
                        })
                        .collect(),
                ))
            }
        }
        Value::Object(map) => {
            let mapping: BTreeMap<String, String> = map
                .into_iter()
                .map(|(k, v)| (k, value_to_string(v)))
                .collect();
            Ok(DataValue::Mapping(mapping))
        }
        other => Ok(DataValue::Scalar(value_to_string(other))),
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
