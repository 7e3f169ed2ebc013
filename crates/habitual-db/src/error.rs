use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

/// Failure kinds surfaced by every store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// A uniqueness rule rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("database lock poisoned: {0}")]
    Lock(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation {
    Unique,
    ForeignKey,
}

pub(crate) fn violation(err: &rusqlite::Error) -> Option<Violation> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(Violation::Unique)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Violation::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Map a failed write: a unique/primary key violation becomes `Conflict`,
/// a dangling reference becomes `NotFound`, anything else stays a store error.
pub(crate) fn classify(err: rusqlite::Error, conflict: &str, missing: &str) -> StoreError {
    match violation(&err) {
        Some(Violation::Unique) => StoreError::Conflict(conflict.to_string()),
        Some(Violation::ForeignKey) => StoreError::NotFound(missing.to_string()),
        None => StoreError::Sqlite(err),
    }
}
