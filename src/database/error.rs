use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Stable classification of a store failure, derived from SQLSTATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreErrorKind {
    DuplicateEntry,
    ForeignKeyViolation,
    NotNullViolation,
    TableNotFound,
    ColumnNotFound,
    PermissionDenied,
    /// Class 22: a value the column type cannot accept
    InvalidInput,
    SyntaxError,
    SerializationConflict,
    Timeout,
    ConnectionLost,
    Database,
}

impl StoreErrorKind {
    pub fn from_sqlstate(code: &str) -> Self {
        match code {
            "23505" => StoreErrorKind::DuplicateEntry,
            "23503" => StoreErrorKind::ForeignKeyViolation,
            "23502" => StoreErrorKind::NotNullViolation,
            "42P01" => StoreErrorKind::TableNotFound,
            "42703" => StoreErrorKind::ColumnNotFound,
            "42501" => StoreErrorKind::PermissionDenied,
            "42601" => StoreErrorKind::SyntaxError,
            c if c.starts_with("22") => StoreErrorKind::InvalidInput,
            "40001" | "40P01" => StoreErrorKind::SerializationConflict,
            "57014" => StoreErrorKind::Timeout,
            "57P01" | "57P02" | "57P03" => StoreErrorKind::ConnectionLost,
            c if c.starts_with("08") => StoreErrorKind::ConnectionLost,
            _ => StoreErrorKind::Database,
        }
    }

    /// Transient failures are expected to clear up on a fresh connection.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            StoreErrorKind::SerializationConflict | StoreErrorKind::Timeout | StoreErrorKind::ConnectionLost
        )
    }

    pub fn code(self) -> &'static str {
        match self {
            StoreErrorKind::DuplicateEntry => "DUPLICATE_ENTRY",
            StoreErrorKind::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            StoreErrorKind::NotNullViolation => "NOT_NULL_VIOLATION",
            StoreErrorKind::TableNotFound => "TABLE_NOT_FOUND",
            StoreErrorKind::ColumnNotFound => "COLUMN_NOT_FOUND",
            StoreErrorKind::PermissionDenied => "PERMISSION_DENIED",
            StoreErrorKind::InvalidInput => "INVALID_INPUT",
            StoreErrorKind::SyntaxError => "SYNTAX_ERROR",
            StoreErrorKind::SerializationConflict => "SERIALIZATION_CONFLICT",
            StoreErrorKind::Timeout => "TIMEOUT",
            StoreErrorKind::ConnectionLost => "CONNECTION_LOST",
            StoreErrorKind::Database => "DATABASE_ERROR",
        }
    }
}

/// A failure reported by (or on the way to) the relational store
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
    pub sqlstate: Option<String>,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), sqlstate: None }
    }

    pub fn from_sqlstate(code: &str, message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::from_sqlstate(code),
            message: message.into(),
            sqlstate: Some(code.to_string()),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => match db_err.code() {
                Some(code) => StoreError::from_sqlstate(&code, db_err.message()),
                None => StoreError::new(StoreErrorKind::Database, db_err.message()),
            },
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) | sqlx::Error::WorkerCrashed => {
                StoreError::new(StoreErrorKind::ConnectionLost, err.to_string())
            }
            sqlx::Error::PoolTimedOut => StoreError::new(StoreErrorKind::Timeout, err.to_string()),
            _ => StoreError::new(StoreErrorKind::Database, err.to_string()),
        }
    }
}

/// Errors from the pool gateway and the resilient executor
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Connection pool exhausted after waiting {waited:?}")]
    PoolExhausted { waited: Duration },

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: StoreError },
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Store(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_constraint_violations_as_fatal() {
        for (code, kind) in [
            ("23505", StoreErrorKind::DuplicateEntry),
            ("23503", StoreErrorKind::ForeignKeyViolation),
            ("23502", StoreErrorKind::NotNullViolation),
            ("42P01", StoreErrorKind::TableNotFound),
            ("42703", StoreErrorKind::ColumnNotFound),
            ("42601", StoreErrorKind::SyntaxError),
            ("42501", StoreErrorKind::PermissionDenied),
            ("22P02", StoreErrorKind::InvalidInput),
            ("22003", StoreErrorKind::InvalidInput),
            ("22007", StoreErrorKind::InvalidInput),
        ] {
            let err = StoreError::from_sqlstate(code, "boom");
            assert_eq!(err.kind, kind);
            assert!(!err.is_transient(), "{} should be fatal", code);
        }
    }

    #[test]
    fn classifies_transient_failures() {
        for code in ["40001", "40P01", "57014", "08006", "08003", "57P01"] {
            assert!(StoreError::from_sqlstate(code, "x").is_transient(), "{} should be transient", code);
        }
        assert!(!StoreError::from_sqlstate("22P02", "x").is_transient());
        assert_eq!(StoreErrorKind::from_sqlstate("XX000"), StoreErrorKind::Database);
    }

    #[test]
    fn io_errors_are_dropped_connections() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = StoreError::from(sqlx::Error::Io(io));
        assert_eq!(err.kind, StoreErrorKind::ConnectionLost);
        assert!(err.is_transient());
    }

    #[test]
    fn stable_codes() {
        assert_eq!(StoreErrorKind::DuplicateEntry.code(), "DUPLICATE_ENTRY");
        assert_eq!(StoreErrorKind::Database.code(), "DATABASE_ERROR");
    }
}
