//! Error types for rowmap.

use thiserror::Error;

/// Main error type for mapping and execution.
#[derive(Error, Debug)]
pub enum OrmError {
    /// Missing or empty table/column metadata, or an absent mapped value.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown attribute, or a value the attribute's type cannot accept.
    #[error("Reflection error: {0}")]
    Reflection(String),

    /// A result row without a value for a mapped column.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Driver lookup or connection-open failures.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors reported by the database engine, passed through unchanged.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl OrmError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn reflection(msg: impl Into<String>) -> Self {
        Self::Reflection(msg.into())
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Configuration Error",
            Self::Reflection(_) => "Reflection Error",
            Self::Mapping(_) => "Mapping Error",
            Self::Connection(_) => "Connection Error",
            Self::Database(_) => "Database Error",
        }
    }
}

/// Result type alias using OrmError.
pub type Result<T> = std::result::Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_configuration() {
        let err = OrmError::configuration("table name missing for `Person`");
        assert_eq!(
            err.to_string(),
            "Configuration error: table name missing for `Person`"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_mapping() {
        let err = OrmError::mapping("no value for column `age`");
        assert_eq!(err.to_string(), "Mapping error: no value for column `age`");
        assert_eq!(err.category(), "Mapping Error");
    }

    #[test]
    fn test_database_error_is_transparent() {
        let inner = rusqlite::Error::InvalidColumnName("nope".to_string());
        let expected = inner.to_string();
        let err: OrmError = inner.into();
        assert_eq!(err.to_string(), expected);
        assert_eq!(err.category(), "Database Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OrmError>();
    }
}
