//! Command packets coming from the client, and the OK/ERR/EOF/column/row
//! packets the server sends back in the text protocol.

use crate::codec::*;
use crate::constants::*;
use crate::error::Error;

/// A decoded client command: the command byte plus whatever payload goes
/// with it (notable commands only — anything else maps to
/// `Unknown` and the dispatcher turns that into ER_UNKNOWN_COM_ERROR).
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    InitDb(String),
    Query(String),
    FieldList(String),
    Ping,
    Unknown(u8),
}

impl Command {
    pub fn read(buffer: &[u8]) -> Result<Self, Error> {
        if buffer.is_empty() {
            return Err(Error::MalformedPacket("empty command packet".into()));
        }
        let (tag, rest) = read_int_1(buffer)?;
        Ok(match tag {
            COM_QUIT => Command::Quit,
            COM_INIT_DB => Command::InitDb(read_eof_string(rest)),
            COM_QUERY => Command::Query(read_eof_string(rest)),
            COM_FIELD_LIST => Command::FieldList(read_eof_string(rest)),
            COM_PING => Command::Ping,
            other => Command::Unknown(other),
        })
    }
}

/// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_ok_packet.html
pub fn write_ok_packet(affected_rows: u64, last_insert_id: u64, warnings: u16, message: &str, buffer: &mut Vec<u8>) {
    write_int_1(0x00, buffer);
    write_lenenc_int(affected_rows, buffer);
    write_lenenc_int(last_insert_id, buffer);
    write_int_2(STATUS_FLAG_AUTOCOMMIT, buffer);
    write_int_2(warnings, buffer);
    buffer.extend_from_slice(message.as_bytes());
}

/// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_eof_packet.html
pub fn write_eof_packet(warnings: u16, buffer: &mut Vec<u8>) {
    write_int_1(0xFE, buffer);
    write_int_2(warnings, buffer);
    write_int_2(STATUS_FLAG_AUTOCOMMIT, buffer);
}

/// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_err_packet.html
pub fn write_err_packet(code: u16, sql_state: &str, message: &str, buffer: &mut Vec<u8>) {
    write_int_1(0xFF, buffer);
    write_int_2(code, buffer);
    buffer.push(b'#');
    buffer.extend_from_slice(sql_state.as_bytes());
    buffer.extend_from_slice(message.as_bytes());
}

pub fn write_err_packet_from(err: &MyError, buffer: &mut Vec<u8>) {
    write_err_packet(err.code, err.sql_state, err.message, buffer)
}

/// First packet of a result set: just the column count.
pub fn write_resultset_header(column_count: usize, buffer: &mut Vec<u8>) {
    write_lenenc_int(column_count as u64, buffer);
}

/// A single column definition. `catalog` is always "def" per the wire
/// format; schema/table/original_table/original_name default to empty
/// since rule-synthesized columns have no backing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub schema: String,
    pub table: String,
    pub original_table: String,
    pub name: String,
    pub original_name: String,
    pub character_set: u16,
    pub column_length: u32,
    pub column_type: u8,
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// A default, `MYSQL_TYPE_STRING` column definition for a rule's
    /// `columns`/`data` output, named `name`.
    pub fn named(name: &str) -> Self {
        ColumnDefinition {
            schema: String::new(),
            table: String::new(),
            original_table: String::new(),
            name: name.to_string(),
            original_name: name.to_string(),
            character_set: CHARSET_UTF8_GENERAL_CI as u16,
            column_length: 1024,
            column_type: MYSQL_TYPE_STRING,
            flags: 0,
            decimals: 0,
        }
    }

    /// https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_com_query_response_text_resultset_column_definition.html
    pub fn write(&self, buffer: &mut Vec<u8>) {
        write_lenenc_string(Some("def"), buffer);
        write_lenenc_string(Some(&self.schema), buffer);
        write_lenenc_string(Some(&self.table), buffer);
        write_lenenc_string(Some(&self.original_table), buffer);
        write_lenenc_string(Some(&self.name), buffer);
        write_lenenc_string(Some(&self.original_name), buffer);
        write_lenenc_int(0x0C, buffer);
        write_int_2(self.character_set, buffer);
        write_int_4(self.column_length, buffer);
        write_int_1(self.column_type, buffer);
        write_int_2(self.flags, buffer);
        write_int_1(self.decimals, buffer);
        write_int_2(0, buffer); // filler
    }
}

/// A text-protocol row: one length-encoded string per column, `None` for
/// SQL NULL (encoded as the bare `0xFB` byte).
pub fn write_row_packet(values: &[Option<String>], buffer: &mut Vec<u8>) {
    for value in values {
        write_lenenc_string(value.as_deref(), buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_decode() {
        assert_eq!(Command::read(&[0x01]).unwrap(), Command::Quit);
        assert_eq!(Command::read(&[0x0E]).unwrap(), Command::Ping);
        assert_eq!(
            Command::read(&[0x02, b't', b'e', b's', b't']).unwrap(),
            Command::InitDb("test".to_string())
        );
        assert_eq!(
            Command::read(&[0x03, b'P', b'I', b'N', b'G']).unwrap(),
            Command::Query("PING".to_string())
        );
        assert_eq!(Command::read(&[0x99]).unwrap(), Command::Unknown(0x99));
    }

    #[test]
    fn test_ok_packet() {
        let mut buf = vec![];
        write_ok_packet(0, 0, 0, "", &mut buf);
        assert_eq!(buf, [0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_eof_packet() {
        let mut buf = vec![];
        write_eof_packet(0, &mut buf);
        assert_eq!(buf, [0xFE, 0x00, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn test_err_packet() {
        let mut buf = vec![];
        write_err_packet(1047, "08S01", "command not supported", &mut buf);
        assert_eq!(buf[0], 0xFF);
        assert_eq!(&buf[1..3], &1047_u16.to_le_bytes());
        assert_eq!(buf[3], b'#');
        assert_eq!(&buf[4..9], b"08S01");
        assert_eq!(&buf[9..], b"command not supported");
    }

    #[test]
    fn test_column_definition_roundtrips_length() {
        let col = ColumnDefinition::named("world");
        let mut buf = vec![];
        col.write(&mut buf);
        // def + schema("") + table("") + original_table("") + name + original_name
        // + lenenc 0x0C + charset(2) + length(4) + type(1) + flags(2) + decimals(1) + filler(2)
        assert!(buf.len() > 12);
    }

    #[test]
    fn test_row_packet_null_is_single_byte() {
        let mut buf = vec![];
        write_row_packet(&[None, Some("x".to_string())], &mut buf);
        assert_eq!(buf[0], 0xFB);
        assert_eq!(&buf[1..], &[1, b'x']);
    }
}
