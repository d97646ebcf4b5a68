use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Failed to encode document: {0}")]
    Encode(String),
    #[error("Failed to decode document: {0}")]
    Decode(String),
    #[error("Expected an object, found {0}")]
    NotAnObject(&'static str),
}

/// An error raised by a [`StorageEngine`](crate::storage::StorageEngine) backend
#[derive(Error, Debug)]
#[error("Storage error: {0}")]
pub struct StorageError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl StorageError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self { Self(err.into()) }

    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) { self.0.as_ref() }

    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync + 'static> { self.0 }
}
