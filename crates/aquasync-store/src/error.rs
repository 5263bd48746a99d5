//! Error types for aquasync-store.

use std::path::PathBuf;

use time::OffsetDateTime;

/// Result type for aquasync-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in aquasync-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Insert rejected because the history must stay ordered by timestamp.
    #[error("Reading at {attempted} is older than the newest stored reading at {newest}")]
    OutOfOrder {
        attempted: OffsetDateTime,
        newest: OffsetDateTime,
    },

    /// Stored timestamp could not be converted back.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}
