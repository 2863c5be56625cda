//! The minimal capability set this server needs from an upstream SQL
//! driver in order to forward a command. The driver itself
//! is an external collaborator: this crate only defines the seam and ships
//! `NullDriver`, which is what a deployment with no DSN configured runs
//! against.

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub nullable: bool,
    pub length: u32,
    /// Defaults to `MYSQL_TYPE_STRING` for anything that isn't obviously
    /// numeric, matching the source's behavior.
    pub mysql_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Option<String>>>,
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

/// An open connection to an upstream database.
pub trait SqlHandle: Send {
    fn try_clone(&self) -> Result<Box<dyn SqlHandle>, Error>;
    fn execute(&mut self, query: &str) -> Result<QueryResult, Error>;
}

/// Opens handles for a DSN. Implementations are provided by whatever is
/// embedding this crate; `NullDriver` is the only one shipped here.
pub trait SqlDriver: Send + Sync {
    fn open(&self, dsn: &str, user: &str, password: &str) -> Result<Box<dyn SqlHandle>, Error>;
}

/// The driver used when no DSN was configured at startup. Any attempt to
/// open a handle through it fails, which is what drives Testable Property
/// / the "no handle; cannot forward" scenario.
pub struct NullDriver;

impl SqlDriver for NullDriver {
    fn open(&self, dsn: &str, _user: &str, _password: &str) -> Result<Box<dyn SqlHandle>, Error> {
        Err(Error::Driver {
            code: 2000,
            sql_state: "HY000".to_string(),
            message: format!("no driver configured to open dsn '{}'", dsn),
        })
    }
}
