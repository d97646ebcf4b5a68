//! Error types for SQLite storage engine

use kenobi_core::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[error("Cannot open SQLite database at {location}: {source}")]
    Unavailable {
        location: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self { StorageError::new(err) }
}
