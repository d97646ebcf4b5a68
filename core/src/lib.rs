//! Core types for Kenobi
//!
//! Holds everything that does not depend on a particular storage backend: the [`Value`]/[`Document`] model, the
//! text [`codec`], single-field [`Predicate`]s with their [`GlobPattern`] matcher, and the [`StorageEngine`] trait
//! that backends implement.

pub mod codec;
pub mod document;
pub mod error;
pub mod glob;
pub mod predicate;
pub mod storage;
pub mod value;

pub use document::Document;
pub use error::{CodecError, StorageError};
pub use glob::GlobPattern;
pub use predicate::Predicate;
pub use storage::{RowId, StorageEngine, StoredDocument, Window};
pub use value::Value;
