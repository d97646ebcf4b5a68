//! Kenobi: an embedded document store on top of SQLite
//!
//! Documents are schemaless JSON objects kept one per row of a single table. Queries match on a single field:
//! equality ([`Database::search`]), glob patterns ([`Database::search_pattern`]) and membership against a list of
//! values ([`Database::find_any`], [`Database::find_all`]).
//!
//! A [`Database`] serializes all access to its storage behind a re-entrant lock, so it can be shared between
//! threads. Blocking work can be pushed onto a small bounded [`WorkerPool`] with [`Database::execute_async`].
//!
//! # Example
//!
//! ```rust,no_run
//! use kenobi::{Database, Document};
//!
//! let db = Database::open("~/kenobi.db")?;
//! db.insert(Document::new().with("name", "Obi-Wan").with("groups", vec!["jedi", "council"]))?;
//!
//! let council = db.find_all("groups", ["jedi", "council"])?;
//! assert_eq!(council.len(), 1);
//!
//! db.update("name", "Obi-Wan", Document::new().with("title", "General"))?;
//! db.close();
//! # Ok::<(), kenobi::KenobiError>(())
//! ```

mod config;
mod database;
mod error;
mod pool;

pub use config::{DatabaseConfig, PoolConfig, ShutdownPolicy, DEFAULT_POOL_SIZE};
pub use database::Database;
pub use error::{KenobiError, Result};
pub use pool::{TaskHandle, WorkerPool};

pub use kenobi_core::{CodecError, Document, GlobPattern, Predicate, RowId, StorageEngine, StorageError, StoredDocument, Value, Window};
pub use kenobi_storage_sqlite::{SqliteConfig, SqliteError, SqliteOptions, SqliteStorageEngine};

/// Parse a JSON object into a [`Document`]. Malformed text is a [`KenobiError::Decode`]; well-formed JSON that is not
/// an object is a [`KenobiError::Validation`].
pub fn from_json(text: &str) -> Result<Document> {
    let json: serde_json::Value = serde_json::from_str(text).map_err(|e| KenobiError::Decode(e.to_string()))?;
    Ok(Document::try_from(json)?)
}

/// Serialize a [`Document`] to compact JSON with keys in sorted order
pub fn to_json(document: &Document) -> Result<String> { Ok(kenobi_core::codec::encode(document)?) }
