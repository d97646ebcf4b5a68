use std::time::Duration;

use kenobi_core::{CodecError, StorageError};
use kenobi_storage_sqlite::SqliteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KenobiError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] SqliteError),
    #[error("Worker pool is closed")]
    PoolClosed,
    #[error("Task was cancelled before it started")]
    TaskCancelled,
    #[error("Task panicked: {0}")]
    TaskPanicked(String),
    #[error("Timed out after {0:?} waiting for task")]
    Timeout(Duration),
    #[error("Task result was already taken")]
    TaskConsumed,
    #[error("Failed to start worker pool: {0}")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KenobiError>;

impl From<CodecError> for KenobiError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Encode(msg) => KenobiError::Encode(msg),
            CodecError::Decode(msg) => KenobiError::Decode(msg),
            CodecError::NotAnObject(found) => KenobiError::Validation(format!("a document must be an object, found {}", found)),
        }
    }
}

impl From<SqliteError> for KenobiError {
    fn from(err: SqliteError) -> Self {
        match err {
            err @ SqliteError::Unavailable { .. } => KenobiError::StorageUnavailable(err),
            err => KenobiError::Storage(err.into()),
        }
    }
}
