//! Single-statement execution with per-call connection ownership.
//!
//! A connection passed in by the caller is used as-is and never closed. When
//! none is passed, the executor opens one from its [`Credentials`] and closes
//! it before returning, on every path. Statements and result rows are released
//! first, rows before statement.

use crate::config::Credentials;
use crate::connection::{Driver, DriverRegistry, Session};
use crate::error::Result;
use crate::mapper::Mapper;
use std::any::type_name;
use std::sync::Arc;
use tracing::{debug, warn};

/// Connection used by one call.
enum Handle<'c> {
    Owned(Box<dyn Session>),
    Borrowed(&'c mut dyn Session),
}

impl Handle<'_> {
    fn session(&mut self) -> &mut dyn Session {
        match self {
            Handle::Owned(session) => session.as_mut(),
            Handle::Borrowed(session) => &mut **session,
        }
    }

    /// Closes an owned connection. On a failed call the close error is logged
    /// and the call's own error is kept.
    fn release<T>(self, outcome: Result<T>) -> Result<T> {
        let Handle::Owned(session) = self else {
            return outcome;
        };
        let closed = session.close();
        if closed.is_ok() {
            debug!("released owned connection");
        }
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "failed to close connection after error");
                Err(e)
            }
        }
    }
}

/// Runs statements and maps read results through a [`Mapper`].
pub struct SqlExecutor {
    credentials: Credentials,
    drivers: DriverRegistry,
    mapper: Arc<Mapper>,
}

impl SqlExecutor {
    pub fn new(credentials: Credentials, mapper: Arc<Mapper>) -> Self {
        Self {
            credentials,
            drivers: DriverRegistry::default(),
            mapper,
        }
    }

    pub fn with_drivers(mut self, drivers: DriverRegistry) -> Self {
        self.drivers = drivers;
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.drivers.register(driver);
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Opens a new connection with the configured driver and credentials.
    pub fn open_connection(&self) -> Result<Box<dyn Session>> {
        let driver = self.drivers.get(self.credentials.driver())?;
        debug!(
            driver = driver.name(),
            url = self.credentials.url(),
            engine = self.credentials.engine_type(),
            "opening connection"
        );
        driver.connect(&self.credentials)
    }

    fn acquire<'c>(&self, connection: Option<&'c mut dyn Session>) -> Result<Handle<'c>> {
        Ok(match connection {
            Some(session) => Handle::Borrowed(session),
            None => Handle::Owned(self.open_connection()?),
        })
    }

    /// Runs a read and maps every row to a new `T`.
    ///
    /// Auto-commit is switched off and no commit is issued.
    pub fn execute_query<T>(
        &self,
        connection: Option<&mut dyn Session>,
        sql: &str,
    ) -> Result<Vec<T>>
    where
        T: Default + 'static,
    {
        let mut handle = self.acquire(connection)?;
        let outcome = self.fetch::<T>(handle.session(), sql);
        match &outcome {
            Ok(objects) => debug!(
                sql,
                rows = objects.len(),
                entity = type_name::<T>(),
                "query finished"
            ),
            Err(e) => warn!(sql, error = %e, "query failed"),
        }
        handle.release(outcome)
    }

    fn fetch<T>(&self, session: &mut dyn Session, sql: &str) -> Result<Vec<T>>
    where
        T: Default + 'static,
    {
        session.set_auto_commit(false)?;
        let mut statement = session.prepare(sql)?;
        let mut rows = statement.query()?;
        let mut objects = Vec::new();
        while let Some(row) = rows.next_row()? {
            objects.push(self.mapper.new_instance_from_row::<T>(row)?);
        }
        Ok(objects)
    }

    /// Runs an update inside a transaction and commits it.
    ///
    /// On failure a rollback is attempted on the connection used, owned or
    /// not, before the error is returned.
    pub fn execute(&self, connection: Option<&mut dyn Session>, sql: &str) -> Result<()> {
        let mut handle = self.acquire(connection)?;
        let outcome = Self::update(handle.session(), sql);
        if let Err(e) = &outcome {
            warn!(sql, error = %e, "update failed, rolling back");
            if let Err(rollback_err) = handle.session().rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
        }
        handle.release(outcome)
    }

    fn update(session: &mut dyn Session, sql: &str) -> Result<()> {
        session.set_auto_commit(false)?;
        let affected = session.prepare(sql)?.execute_update()?;
        session.commit()?;
        debug!(sql, affected, "update committed");
        Ok(())
    }
}
