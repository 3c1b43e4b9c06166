//! Scripted in-memory driver for testing.
//!
//! Every session operation is recorded in a shared [`Journal`] so tests can
//! assert on commit, rollback and release order.

use super::{Driver, ResultRows, Session, Statement};
use crate::config::Credentials;
use crate::error::{OrmError, Result};
use crate::mapper::RowSource;
use crate::value::Value;
use rusqlite::ffi;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Something that happened to a mock session.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Opened,
    AutoCommit(bool),
    Prepared(String),
    Queried,
    Updated,
    Committed,
    RolledBack,
    RowsReleased,
    StatementReleased,
    Closed,
}

/// Shared, ordered record of [`Event`]s.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: Event) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.events().contains(event)
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

pub type MockRow = HashMap<String, Value>;

#[derive(Debug, Clone, Default)]
struct Script {
    rows: Vec<MockRow>,
    fail_after: Option<usize>,
    fail_updates: bool,
    fail_connect: bool,
    fail_close: bool,
}

/// Engine-side failure as the real driver would report it.
fn engine_error(msg: &str) -> OrmError {
    OrmError::Database(rusqlite::Error::SqliteFailure(
        ffi::Error::new(ffi::SQLITE_ERROR),
        Some(msg.to_string()),
    ))
}

/// Driver handing out [`MockSession`]s that share one journal and script.
#[derive(Debug, Clone)]
pub struct MockDriver {
    name: String,
    journal: Journal,
    script: Script,
}

impl MockDriver {
    pub fn new(journal: Journal) -> Self {
        Self {
            name: "mock".to_string(),
            journal,
            script: Script::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Rows returned by every query.
    pub fn with_rows(mut self, rows: Vec<MockRow>) -> Self {
        self.script.rows = rows;
        self
    }

    /// Fails the fetch after `rows` rows have been delivered.
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.script.fail_after = Some(rows);
        self
    }

    pub fn failing_updates(mut self) -> Self {
        self.script.fail_updates = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.script.fail_close = true;
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.script.fail_connect = true;
        self
    }

    /// A session opened outside any executor.
    pub fn session(&self) -> MockSession {
        self.journal.record(Event::Opened);
        MockSession {
            journal: self.journal.clone(),
            script: self.script.clone(),
        }
    }
}

impl Driver for MockDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>> {
        if self.script.fail_connect {
            return Err(OrmError::connection(format!(
                "mock refused connection to `{}`",
                credentials.url()
            )));
        }
        Ok(Box::new(self.session()))
    }
}

pub struct MockSession {
    journal: Journal,
    script: Script,
}

impl Session for MockSession {
    fn set_auto_commit(&mut self, enabled: bool) -> Result<()> {
        self.journal.record(Event::AutoCommit(enabled));
        Ok(())
    }

    fn prepare<'s>(&'s mut self, sql: &str) -> Result<Box<dyn Statement + 's>> {
        self.journal.record(Event::Prepared(sql.to_string()));
        Ok(Box::new(MockStatement { session: self }))
    }

    fn commit(&mut self) -> Result<()> {
        self.journal.record(Event::Committed);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.journal.record(Event::RolledBack);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.journal.record(Event::Closed);
        if self.script.fail_close {
            return Err(engine_error("close interrupted"));
        }
        Ok(())
    }
}

struct MockStatement<'s> {
    session: &'s MockSession,
}

impl Statement for MockStatement<'_> {
    fn query(&mut self) -> Result<Box<dyn ResultRows + '_>> {
        self.session.journal.record(Event::Queried);
        Ok(Box::new(MockRows {
            journal: &self.session.journal,
            script: &self.session.script,
            position: 0,
        }))
    }

    fn execute_update(&mut self) -> Result<usize> {
        self.session.journal.record(Event::Updated);
        if self.session.script.fail_updates {
            return Err(engine_error("constraint failed"));
        }
        Ok(1)
    }
}

impl Drop for MockStatement<'_> {
    fn drop(&mut self) {
        self.session.journal.record(Event::StatementReleased);
    }
}

struct MockRows<'s> {
    journal: &'s Journal,
    script: &'s Script,
    position: usize,
}

impl ResultRows for MockRows<'_> {
    fn next_row(&mut self) -> Result<Option<&dyn RowSource>> {
        if self.script.fail_after == Some(self.position) {
            return Err(engine_error("connection reset during fetch"));
        }
        let row = self.script.rows.get(self.position);
        self.position += 1;
        Ok(row.map(|r| r as &dyn RowSource))
    }
}

impl Drop for MockRows<'_> {
    fn drop(&mut self) {
        self.journal.record(Event::RowsReleased);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_records_in_order() {
        let journal = Journal::new();
        let driver = MockDriver::new(journal.clone()).with_rows(vec![MockRow::new()]);
        let mut session = driver.session();
        {
            let mut statement = session.prepare("SELECT 1").unwrap();
            let mut rows = statement.query().unwrap();
            assert!(rows.next_row().unwrap().is_some());
            assert!(rows.next_row().unwrap().is_none());
        }
        Box::new(session).close().unwrap();
        assert_eq!(
            journal.events(),
            vec![
                Event::Opened,
                Event::Prepared("SELECT 1".to_string()),
                Event::Queried,
                Event::RowsReleased,
                Event::StatementReleased,
                Event::Closed,
            ]
        );
    }

    #[test]
    fn scripted_fetch_failure() {
        let journal = Journal::new();
        let driver = MockDriver::new(journal)
            .with_rows(vec![MockRow::new(), MockRow::new()])
            .failing_after(1);
        let mut session = driver.session();
        let mut statement = session.prepare("SELECT 1").unwrap();
        let mut rows = statement.query().unwrap();
        assert!(rows.next_row().unwrap().is_some());
        assert!(matches!(rows.next_row(), Err(OrmError::Database(_))));
    }
}
