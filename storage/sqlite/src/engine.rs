//! SQLite storage engine implementation

use std::path::Path;

use kenobi_core::storage::{RowId, StorageEngine, StoredDocument, Window};
use kenobi_core::StorageError;
use rusqlite::{params, Connection, Params, ToSql};
use tracing::{debug, info, warn};

use crate::connection::{journal_mode, open_connection, SqliteConfig, SqliteOptions};
use crate::error::SqliteError;

/// Name of the single document table
pub const TABLE_NAME: &str = "documents";

/// Name of the auxiliary index over the document column
pub const INDEX_NAME: &str = "documents_data_idx";

/// SQLite storage engine
///
/// Holds one connection. `rusqlite::Connection` is `Send` but not `Sync`, so the engine is too; callers that share
/// it across threads wrap it in a lock.
pub struct SqliteStorageEngine {
    conn: Connection,
    config: SqliteConfig,
}

impl SqliteStorageEngine {
    /// Open a file-based SQLite database, creating the file, table and index if they don't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteError> { Self::with_config(SqliteConfig::file(path), SqliteOptions::default()) }

    /// Open an in-memory SQLite database (for testing)
    pub fn open_in_memory() -> Result<Self, SqliteError> { Self::with_config(SqliteConfig::Memory, SqliteOptions::default()) }

    pub fn with_config(config: SqliteConfig, options: SqliteOptions) -> Result<Self, SqliteError> {
        let conn = open_connection(&config, &options)?;
        create_document_table(&conn).map_err(|source| SqliteError::Unavailable { location: config.location(), source })?;
        info!("Opened SQLite document store at {}", config.location());
        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &SqliteConfig { &self.config }

    /// Get a reference to the underlying connection (for testing/diagnostics)
    pub fn connection(&self) -> &Connection { &self.conn }

    pub fn journal_mode(&self) -> Result<String, SqliteError> { Ok(journal_mode(&self.conn)?) }

    /// Run one parameterized statement, returning the number of affected rows
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, SqliteError> {
        debug!("execute: {}", sql);
        Ok(self.conn.execute(sql, params)?)
    }

    /// Run one statement once per parameter set, as a single transaction
    ///
    /// Either every execution commits or none does.
    pub fn execute_many<P, I>(&self, sql: &str, batch: I) -> Result<usize, SqliteError>
    where
        P: Params,
        I: IntoIterator<Item = P>,
    {
        debug!("execute_many: {}", sql);
        self.transaction(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let mut affected = 0;
            for params in batch {
                affected += stmt.execute(params)?;
            }
            Ok(affected)
        })
    }

    /// Run a `SELECT` yielding `(id, data)` rows
    pub fn query<P: Params>(&self, sql: &str, params: P) -> Result<Vec<StoredDocument>, SqliteError> {
        debug!("query: {}", sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, |row| Ok(StoredDocument { id: row.get(0)?, data: row.get(1)? }))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Commit the open transaction, if any. Does nothing in autocommit mode.
    pub fn commit(&self) -> Result<(), SqliteError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&self) -> Result<(), SqliteError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// Run `f` inside an immediate transaction, committing on success and rolling back on any error
    fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T, SqliteError>) -> Result<T, SqliteError> {
        // IMMEDIATE takes the write lock up front, so a busy database is reported here rather than mid-way
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(&self.conn).and_then(|out| self.commit().map(|_| out)) {
            Ok(out) => Ok(out),
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!("Rollback failed after error {}: {}", err, rollback_err);
                }
                Err(err)
            }
        }
    }
}

fn create_document_table(conn: &Connection) -> Result<(), rusqlite::Error> {
    let query = format!(
        r#"CREATE TABLE IF NOT EXISTS "{}"(
            "id" INTEGER PRIMARY KEY AUTOINCREMENT,
            "data" TEXT NOT NULL CHECK (json_valid("data"))
        )"#,
        TABLE_NAME
    );
    debug!("Creating document table: {}", query);
    conn.execute(&query, [])?;

    let index_query = format!(r#"CREATE INDEX IF NOT EXISTS "{}" ON "{}"("data")"#, INDEX_NAME, TABLE_NAME);
    conn.execute(&index_query, [])?;

    Ok(())
}

fn sql_bound(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

impl StorageEngine for SqliteStorageEngine {
    fn insert(&self, data: &str) -> Result<RowId, StorageError> {
        let id = self.transaction(|conn| {
            conn.execute(&format!(r#"INSERT INTO "{}"("data") VALUES(?1)"#, TABLE_NAME), [data])?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!("insert: row {}", id);
        Ok(id)
    }

    fn insert_many(&self, data: &[String]) -> Result<usize, StorageError> {
        if data.is_empty() {
            return Ok(0);
        }
        let query = format!(r#"INSERT INTO "{}"("data") VALUES(?1)"#, TABLE_NAME);
        let inserted = self.execute_many(&query, data.iter().map(|d| [d]))?;
        debug!("insert_many: {} rows", inserted);
        Ok(inserted)
    }

    fn scan(&self, window: Window) -> Result<Vec<StoredDocument>, StorageError> {
        let query = format!(r#"SELECT "id", "data" FROM "{}" ORDER BY "id" LIMIT ?1 OFFSET ?2"#, TABLE_NAME);
        // a negative LIMIT is unbounded in SQLite
        let limit = window.limit.map(sql_bound).unwrap_or(-1);
        Ok(self.query(&query, params![limit, sql_bound(window.offset)])?)
    }

    fn replace(&self, rows: &[StoredDocument]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let query = format!(r#"UPDATE "{}" SET "data" = ?1 WHERE "id" = ?2"#, TABLE_NAME);
        let updated = self.execute_many(&query, rows.iter().map(|row| [&row.data as &dyn ToSql, &row.id as &dyn ToSql]))?;
        debug!("replace: {} rows", updated);
        Ok(updated)
    }

    fn delete(&self, ids: &[RowId]) -> Result<usize, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let query = format!(r#"DELETE FROM "{}" WHERE "id" = ?1"#, TABLE_NAME);
        let deleted = self.execute_many(&query, ids.iter().map(|id| [id]))?;
        debug!("delete: {} rows", deleted);
        Ok(deleted)
    }

    fn purge(&self) -> Result<usize, StorageError> {
        let query = format!(r#"DELETE FROM "{}""#, TABLE_NAME);
        let deleted = self.transaction(|conn| Ok(conn.execute(&query, [])?))?;
        debug!("purge: {} rows", deleted);
        Ok(deleted)
    }

    fn count(&self) -> Result<u64, StorageError> {
        let query = format!(r#"SELECT COUNT(*) FROM "{}""#, TABLE_NAME);
        let count: i64 = self.conn.query_row(&query, [], |row| row.get(0)).map_err(SqliteError::from)?;
        Ok(count.max(0) as u64)
    }
}
