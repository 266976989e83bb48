//! Error types for the data-access layer
//!
//! This module defines all error types that can occur while synthesizing
//! statements, binding parameters, and talking to a database driver.

/// Result type alias for data-access operations
pub type Result<T> = std::result::Result<T, DbError>;

/// Error types for data-access operations
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A write operation's source yielded no columns after filtering.
    /// Raised before any statement is sent.
    #[error("nothing to write: the filtered value set is empty")]
    EmptyProjection,

    /// A batch insert received no members, or its column union is empty.
    /// Raised before any statement is sent.
    #[error("nothing to insert: empty batch or empty batch elements")]
    EmptyBatch,

    /// Primary key, unique constraint or foreign key violation reported by
    /// the driver. Never swallowed; plain inserts fail loudly on duplicates.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Commit or rollback was requested on a transaction that already
    /// reached a terminal state.
    #[error("transaction already committed or rolled back")]
    TransactionFinished,

    /// Transaction error (generic)
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Two parameters with the same name were bound to one statement
    #[error("duplicate parameter name: {0}")]
    DuplicateParameter(String),

    /// Column not found while materializing a row
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Type conversion error
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("query error: {0}")]
    Query(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl DbError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        DbError::Connection(msg.into())
    }

    /// Create a new query error
    pub fn query<S: Into<String>>(msg: S) -> Self {
        DbError::Query(msg.into())
    }

    /// Create a new transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        DbError::Transaction(msg.into())
    }

    /// Create a new constraint violation error
    pub fn constraint<S: Into<String>>(msg: S) -> Self {
        DbError::ConstraintViolation(msg.into())
    }

    /// Create a new type mismatch error
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        DbError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DbError::connection("Failed to connect");
        assert!(matches!(err, DbError::Connection(_)));

        let err = DbError::query("Invalid SQL");
        assert!(matches!(err, DbError::Query(_)));

        let err = DbError::type_mismatch("i64", "String");
        assert!(matches!(err, DbError::TypeMismatch { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Connection refused");
        assert_eq!(err.to_string(), "connection error: Connection refused");

        let err = DbError::type_mismatch("i64", "f64");
        assert_eq!(err.to_string(), "type mismatch: expected i64, got f64");

        assert_eq!(
            DbError::EmptyProjection.to_string(),
            "nothing to write: the filtered value set is empty"
        );
    }
}
