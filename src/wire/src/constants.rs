#![allow(dead_code)]

//! Capability flags, command tags and MySQL type codes for the text protocol.
//! https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__capabilities__flags.html

pub const CAPABILITY_CLIENT_LONG_PASSWORD: u32 = 0x0000_0001;
pub const CAPABILITY_CLIENT_FOUND_ROWS: u32 = 0x0000_0002;
pub const CAPABILITY_CLIENT_LONG_FLAG: u32 = 0x0000_0004;
pub const CAPABILITY_CLIENT_CONNECT_WITH_DB: u32 = 0x0000_0008;
pub const CAPABILITY_CLIENT_NO_SCHEMA: u32 = 0x0000_0010;
pub const CAPABILITY_CLIENT_PROTOCOL_41: u32 = 0x0000_0200;
pub const CAPABILITY_CLIENT_SECURE_CONNECTION: u32 = 0x0000_8000;
pub const CAPABILITY_CLIENT_TRANSACTIONS: u32 = 0x0000_2000;
pub const CAPABILITY_CLIENT_MULTI_RESULTS: u32 = 0x0002_0000;
pub const CAPABILITY_CLIENT_PLUGIN_AUTH: u32 = 0x0008_0000;
pub const CAPABILITY_CLIENT_CONNECT_ATTRS: u32 = 0x0010_0000;
pub const CAPABILITY_CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 0x0020_0000;
pub const CAPABILITY_CLIENT_SESSION_TRACK: u32 = 0x0080_0000;
pub const CAPABILITY_CLIENT_DEPRECATE_EOF: u32 = 0x0100_0000;

/// The set of capabilities this server advertises during the handshake.
/// DEPRECATE_EOF is deliberately excluded: the server always terminates a
/// result set with EOF rather than the newer OK-with-EOF-flag.
pub const SERVER_CAPABILITIES: u32 = CAPABILITY_CLIENT_LONG_PASSWORD
    | CAPABILITY_CLIENT_FOUND_ROWS
    | CAPABILITY_CLIENT_LONG_FLAG
    | CAPABILITY_CLIENT_CONNECT_WITH_DB
    | CAPABILITY_CLIENT_PROTOCOL_41
    | CAPABILITY_CLIENT_SECURE_CONNECTION
    | CAPABILITY_CLIENT_TRANSACTIONS
    | CAPABILITY_CLIENT_PLUGIN_AUTH;

pub const CHARSET_UTF8_GENERAL_CI: u8 = 33;

pub const STATUS_FLAG_AUTOCOMMIT: u16 = 0x0002;

pub const AUTH_PLUGIN_NAME: &str = "mysql_native_password";

/// https://dev.mysql.com/doc/dev/mysql-server/latest/my__command_8h.html
pub const COM_QUIT: u8 = 0x01;
pub const COM_INIT_DB: u8 = 0x02;
pub const COM_QUERY: u8 = 0x03;
pub const COM_FIELD_LIST: u8 = 0x04;
pub const COM_PING: u8 = 0x0E;

/// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_dt_integers.html#sect_protocol_basic_dt_integers_fixed
pub const MYSQL_TYPE_DECIMAL: u8 = 0x00;
pub const MYSQL_TYPE_TINY: u8 = 0x01;
pub const MYSQL_TYPE_SHORT: u8 = 0x02;
pub const MYSQL_TYPE_LONG: u8 = 0x03;
pub const MYSQL_TYPE_FLOAT: u8 = 0x04;
pub const MYSQL_TYPE_DOUBLE: u8 = 0x05;
pub const MYSQL_TYPE_NULL: u8 = 0x06;
pub const MYSQL_TYPE_LONGLONG: u8 = 0x08;
pub const MYSQL_TYPE_DATE: u8 = 0x0a;
pub const MYSQL_TYPE_DATETIME: u8 = 0x0c;
pub const MYSQL_TYPE_VAR_STRING: u8 = 0xfd;
/// The default column type for rule-synthesized result sets.
pub const MYSQL_TYPE_STRING: u8 = 0xfe;
pub const MYSQL_TYPE_BLOB: u8 = 0xfc;

pub struct MyError<'a> {
    pub code: u16,
    pub sql_state: &'a str,
    pub message: &'a str,
}

// https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html
pub const ER_ACCESS_DENIED: MyError<'static> = MyError {
    code: 1044,
    sql_state: "28000",
    message: "Access denied",
};

pub const ER_UNKNOWN_COM_ERROR: MyError<'static> = MyError {
    code: 1047,
    sql_state: "08S01",
    message: "command not supported",
};
