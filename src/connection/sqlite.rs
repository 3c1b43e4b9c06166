use super::{Driver, ResultRows, Session, Statement};
use crate::config::Credentials;
use crate::error::{OrmError, Result};
use crate::mapper::RowSource;
use rusqlite::Connection;
use tracing::debug;

/// Driver for SQLite files and in-memory databases.
///
/// Accepts `:memory:`, `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>`,
/// `jdbc:sqlite:<path>` or a bare path. SQLite has no authentication, so user
/// and password are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    fn location(url: &str) -> &str {
        let url = url.strip_prefix("jdbc:").unwrap_or(url);
        url.strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url)
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>> {
        let location = Self::location(credentials.url());
        if location.is_empty() {
            return Err(OrmError::connection("sqlite url names no database"));
        }
        let session = if location == ":memory:" {
            SqliteSession::open_in_memory()?
        } else {
            SqliteSession::open(location)?
        };
        Ok(Box::new(session))
    }
}

/// A [`Session`] over a `rusqlite` connection.
pub struct SqliteSession {
    conn: Connection,
    auto_commit: bool,
}

impl SqliteSession {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| OrmError::connection(format!("cannot open `{path}`: {e}")))?;
        debug!(path, "opened sqlite connection");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| OrmError::connection(format!("cannot open in-memory database: {e}")))?;
        debug!("opened in-memory sqlite connection");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            auto_commit: true,
        }
    }

    /// The underlying connection, for statements outside the executor.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.auto_commit && self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }
}

impl Session for SqliteSession {
    fn set_auto_commit(&mut self, enabled: bool) -> Result<()> {
        if enabled && self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.auto_commit = enabled;
        self.begin_if_needed()
    }

    fn prepare<'s>(&'s mut self, sql: &str) -> Result<Box<dyn Statement + 's>> {
        self.begin_if_needed()?;
        debug!(sql, "preparing statement");
        Ok(Box::new(SqliteStatement(self.conn.prepare(sql)?)))
    }

    fn commit(&mut self) -> Result<()> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, e)| OrmError::from(e))?;
        debug!("closed sqlite connection");
        Ok(())
    }
}

struct SqliteStatement<'c>(rusqlite::Statement<'c>);

impl Statement for SqliteStatement<'_> {
    fn query(&mut self) -> Result<Box<dyn ResultRows + '_>> {
        Ok(Box::new(SqliteRows(self.0.query([])?)))
    }

    fn execute_update(&mut self) -> Result<usize> {
        Ok(self.0.execute([])?)
    }
}

struct SqliteRows<'s>(rusqlite::Rows<'s>);

impl ResultRows for SqliteRows<'_> {
    fn next_row(&mut self) -> Result<Option<&dyn RowSource>> {
        Ok(self.0.next()?.map(|row| row as &dyn RowSource))
    }
}
