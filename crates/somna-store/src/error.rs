//! Error types for somna-store

use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum Error {
    /// The database engine rejected an operation (I/O, constraint, transaction failure)
    #[error("storage i/o error: {0}")]
    StorageIo(#[from] sqlx::Error),

    /// A stored row could not be decoded into a record
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// The read was cancelled before it completed
    #[error("operation cancelled")]
    Cancelled,

    /// The live query is no longer running
    #[error("live query closed")]
    Closed,
}

impl Error {
    /// Whether the failure is worth retrying by the caller.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageIo(_))
    }

    /// Whether the failure indicates corrupted stored data.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::DataIntegrity(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
