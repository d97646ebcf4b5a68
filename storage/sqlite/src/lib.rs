//! SQLite storage engine for Kenobi
//!
//! Stores every document as one JSON text row of a single `documents` table:
//!
//! - Single-file database (portable, easy backup)
//! - Write-ahead logging, so readers proceed while a writer commits
//! - Every mutation runs in its own `BEGIN IMMEDIATE` transaction
//!
//! The `data` column is indexed and constrained with `json_valid()`, but documents are never queried by content in
//! SQL. Filtering happens on decoded documents in the layer above.
//!
//! # Example
//!
//! ```rust,no_run
//! use kenobi_storage_sqlite::SqliteStorageEngine;
//!
//! // Open a file-based database
//! let storage = SqliteStorageEngine::open("~/kenobi.db")?;
//!
//! // Or use an in-memory database for testing
//! let storage = SqliteStorageEngine::open_in_memory()?;
//! # Ok::<(), kenobi_storage_sqlite::SqliteError>(())
//! ```

mod connection;
mod engine;
mod error;

pub use connection::{SqliteConfig, SqliteOptions, DEFAULT_BUSY_TIMEOUT};
pub use engine::{SqliteStorageEngine, INDEX_NAME, TABLE_NAME};
pub use error::SqliteError;
