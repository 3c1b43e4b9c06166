//! Descriptor-driven row mapping and statement execution over SQLite.
//!
//! # Intention
//!
//! - Describe a plain Rust type once (table, columns, accessors) and reuse
//!   that description to render SQL value lists and to build objects from
//!   result rows.
//! - Run one pre-rendered statement per call, opening and closing a
//!   connection when the caller does not provide one.
//!
//! # Architectural Boundaries
//!
//! - No query building beyond string concatenation, no pooling, no
//!   migrations.
//! - Statements are not parameterised. Values are inlined unescaped, so
//!   only trusted data may be rendered.

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mapper;
pub mod value;

pub use config::Credentials;
pub use connection::{
    Driver, DriverRegistry, ResultRows, Session, SqliteDriver, SqliteSession, Statement,
};
pub use entity::{Attribute, ColumnBinding, EntityDescriptor};
pub use error::{OrmError, Result};
pub use executor::SqlExecutor;
pub use mapper::{Mapper, RowSource};
pub use value::{DataType, SqlType, Value};
