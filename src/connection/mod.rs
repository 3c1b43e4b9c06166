//! Connection layer.
//!
//! Provides a trait-based interface over a database connection so the
//! executor can drive SQLite and test doubles the same way. Drivers are looked
//! up by identifier in a [`DriverRegistry`].

pub mod mock;
mod sqlite;

pub use sqlite::{SqliteDriver, SqliteSession};

use crate::config::Credentials;
use crate::error::{OrmError, Result};
use crate::mapper::RowSource;
use std::collections::HashMap;
use std::sync::Arc;

/// An open connection.
pub trait Session: Send {
    /// Turning auto-commit off starts a transaction before the next statement;
    /// turning it on commits any open transaction.
    fn set_auto_commit(&mut self, enabled: bool) -> Result<()>;

    fn prepare<'s>(&'s mut self, sql: &str) -> Result<Box<dyn Statement + 's>>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}

/// A prepared statement. Dropping it releases it.
pub trait Statement {
    fn query(&mut self) -> Result<Box<dyn ResultRows + '_>>;

    /// Runs the statement as an update, returning the affected row count.
    fn execute_update(&mut self) -> Result<usize>;
}

/// Cursor over a query result. Dropping it releases it.
pub trait ResultRows {
    fn next_row(&mut self) -> Result<Option<&dyn RowSource>>;
}

/// Opens sessions for one driver identifier.
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>>;
}

/// Drivers available to an executor, keyed by identifier.
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Registry with no drivers at all.
    pub fn empty() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    pub fn register(&mut self, driver: Arc<dyn Driver>) -> &mut Self {
        self.drivers.insert(driver.name().to_string(), driver);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| OrmError::connection(format!("no driver registered as `{name}`")))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(SqliteDriver));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_sqlite() {
        let registry = DriverRegistry::default();
        assert_eq!(registry.names(), vec!["sqlite"]);
        assert_eq!(registry.get("sqlite").unwrap().name(), "sqlite");
    }

    #[test]
    fn unknown_driver_is_connection_error() {
        let registry = DriverRegistry::empty();
        assert!(matches!(
            registry.get("org.postgresql.Driver"),
            Err(OrmError::Connection(_))
        ));
    }
}
