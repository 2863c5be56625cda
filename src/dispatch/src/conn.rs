//! Per-connection state: everything here is owned by a single
//! worker thread and dropped at disconnect. Interior mutability is plain
//! `RefCell`/`Cell` rather than locks, since nothing but the owning thread
//! ever touches a given `ConnState`.

use crate::driver::SqlDriver;
use crate::error::Error;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

/// A data-source name plus credentials, used both for the server's default
/// upstream and for any per-rule `dsn` override.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dsn {
    pub dsn: String,
    pub user: String,
    pub password: String,
}

pub struct ConnState {
    pub username: RefCell<String>,
    pub database: RefCell<Option<String>>,
    pub remote_host: String,
    pub default_dsn: Option<Dsn>,
    pub remote_dsn: Option<Dsn>,
    handle: RefCell<Option<Box<dyn crate::driver::SqlHandle>>>,
    driver: Arc<dyn SqlDriver>,
    vars: RefCell<HashMap<String, String>>,
    pub data_sent: Cell<bool>,
}

impl ConnState {
    pub fn new(remote_host: String, driver: Arc<dyn SqlDriver>, default_dsn: Option<Dsn>, remote_dsn: Option<Dsn>) -> Self {
        let mut vars = HashMap::new();
        if let Some(dsn) = &default_dsn {
            vars.insert("dsn".to_string(), dsn.dsn.clone());
            vars.insert("dsn_user".to_string(), dsn.user.clone());
        }
        if let Some(dsn) = &remote_dsn {
            vars.insert("remote_dsn".to_string(), dsn.dsn.clone());
            vars.insert("remote_dsn_user".to_string(), dsn.user.clone());
        }

        ConnState {
            username: RefCell::new(String::new()),
            database: RefCell::new(None),
            remote_host,
            default_dsn,
            remote_dsn,
            handle: RefCell::new(None),
            driver,
            vars: RefCell::new(vars),
            data_sent: Cell::new(false),
        }
    }

    /// Opens (or re-opens) the connection's active handle against `dsn`,
    /// replacing whatever handle was previously active.
    pub fn connect(&self, dsn: &Dsn) -> Result<(), Error> {
        let handle = self.driver.open(&dsn.dsn, &dsn.user, &dsn.password)?;
        *self.handle.borrow_mut() = Some(handle);
        Ok(())
    }

    pub fn has_handle(&self) -> bool {
        self.handle.borrow().is_some()
    }

    pub fn with_handle<R>(&self, f: impl FnOnce(&mut dyn crate::driver::SqlHandle) -> R) -> Option<R> {
        self.handle.borrow_mut().as_deref_mut().map(f)
    }

    pub fn get_var(&self, name: &str) -> Option<String> {
        self.vars.borrow().get(name).cloned()
    }

    /// Setting `dsn` triggers a reconnect through the active driver,
    /// swapping the connection's active handle as a side effect rather
    /// than just recording the new value.
    pub fn set_var(&self, name: &str, value: String) -> Result<(), Error> {
        if name == "dsn" {
            let user = self.vars.borrow().get("dsn_user").cloned().unwrap_or_default();
            let password = self.vars.borrow().get("dsn_password").cloned().unwrap_or_default();
            self.connect(&Dsn {
                dsn: value.clone(),
                user,
                password,
            })?;
        }
        self.vars.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }
}
