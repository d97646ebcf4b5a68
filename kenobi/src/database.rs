use std::path::Path;

use kenobi_core::{codec, Document, Predicate, RowId, StorageEngine, StoredDocument, Value, Window};
use kenobi_storage_sqlite::SqliteStorageEngine;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, info};

use crate::config::{DatabaseConfig, PoolConfig};
use crate::error::{KenobiError, Result};
use crate::pool::{TaskHandle, WorkerPool};

/// A document store backed by a single table.
///
/// Every operation holds a re-entrant lock on the storage engine for its whole duration, so a `Database` can be
/// shared between threads (usually behind an [`Arc`](std::sync::Arc)) and each call sees and leaves a consistent
/// table. The same thread may call back into the database while holding the lock.
pub struct Database {
    pool: WorkerPool,
    storage: ReentrantMutex<Box<dyn StorageEngine>>,
    location: String,
}

impl Database {
    /// Open (creating if needed) the database file at `path`. A leading `~` is expanded to the home directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> { Self::with_config(DatabaseConfig::file(path)) }

    pub fn open_in_memory() -> Result<Self> { Self::with_config(DatabaseConfig::memory()) }

    pub fn with_config(config: DatabaseConfig) -> Result<Self> {
        let location = config.storage.location();
        let engine = SqliteStorageEngine::with_config(config.storage, config.sqlite)?;
        let mut db = Self::with_storage(Box::new(engine), config.pool)?;
        db.location = location;
        info!("Opened database at {}", db.location);
        Ok(db)
    }

    /// Build a database on top of any storage engine
    pub fn with_storage(storage: Box<dyn StorageEngine>, pool: PoolConfig) -> Result<Self> {
        Ok(Self { pool: WorkerPool::new(pool)?, storage: ReentrantMutex::new(storage), location: "<custom>".to_string() })
    }

    pub fn location(&self) -> &str { &self.location }

    pub fn pool(&self) -> &WorkerPool { &self.pool }

    fn lock(&self) -> ReentrantMutexGuard<'_, Box<dyn StorageEngine>> { self.storage.lock() }

    pub fn insert(&self, document: Document) -> Result<()> {
        let storage = self.lock();
        let data = codec::encode(&document)?;
        let id = storage.insert(&data)?;
        debug!("Inserted document as row {}", id);
        Ok(())
    }

    /// Insert every document or none of them. Nothing is written if any document fails to encode.
    pub fn insert_many(&self, documents: impl IntoIterator<Item = Document>) -> Result<usize> {
        let storage = self.lock();
        let data = documents.into_iter().map(|document| codec::encode(&document)).collect::<std::result::Result<Vec<_>, _>>()?;
        if data.is_empty() {
            return Ok(0);
        }
        let inserted = storage.insert_many(&data)?;
        debug!("Inserted {} documents", inserted);
        Ok(inserted)
    }

    /// Delete every document whose `key` equals `value`, returning the deleted documents in insertion order
    pub fn remove(&self, key: &str, value: impl Into<Value>) -> Result<Vec<Document>> {
        let value = value.into();
        let predicate = equality(key, value.clone())?;
        let storage = self.lock();

        let matched = self.scan_matching(&predicate)?;
        let ids: Vec<RowId> = matched.iter().map(|(id, _)| *id).collect();
        if !ids.is_empty() {
            storage.delete(&ids)?;
        }
        debug!("Removed {} documents where {} = {}", ids.len(), key, value);
        Ok(matched.into_iter().map(|(_, document)| document).collect())
    }

    /// Shallow-merge `new_data` into every document whose `key` equals `value`. Keys in `new_data` overwrite, all
    /// other keys are kept. Returns how many documents changed.
    pub fn update(&self, key: &str, value: impl Into<Value>, new_data: Document) -> Result<usize> {
        let value = value.into();
        let predicate = equality(key, value.clone())?;
        let storage = self.lock();

        let rows = self
            .scan_matching(&predicate)?
            .into_iter()
            .map(|(id, mut document)| -> Result<StoredDocument> {
                document.merge(new_data.clone());
                Ok(StoredDocument { id, data: codec::encode(&document)? })
            })
            .collect::<Result<Vec<_>>>()?;
        if rows.is_empty() {
            return Ok(0);
        }

        let updated = storage.replace(&rows)?;
        debug!("Updated {} documents where {} = {}", updated, key, value);
        Ok(updated)
    }

    /// Delete every document. Returns how many were deleted.
    pub fn purge(&self) -> Result<usize> {
        let storage = self.lock();
        let purged = storage.purge()?;
        debug!("Purged {} documents", purged);
        Ok(purged)
    }

    pub fn count(&self) -> Result<u64> { Ok(self.lock().count()?) }

    /// All documents in insertion order. A missing or non-positive `limit` means no limit.
    pub fn all(&self, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Document>> {
        let window = window(limit, offset)?;
        let storage = self.lock();
        storage.scan(window)?.iter().map(|row| codec::decode(&row.data).map_err(KenobiError::from)).collect()
    }

    /// Documents whose `key` equals `value`, paginated after filtering
    pub fn search(&self, key: &str, value: impl Into<Value>, limit: Option<i64>, offset: Option<i64>) -> Result<Vec<Document>> {
        let predicate = equality(key, value.into())?;
        self.find(&predicate, window(limit, offset)?)
    }

    /// Documents whose `key` is a string matching the glob `pattern` (`*`, `?`, `[...]`)
    pub fn search_pattern(&self, key: &str, pattern: &str) -> Result<Vec<Document>> {
        require_key(key)?;
        self.find(&Predicate::glob(key, pattern), Window::ALL)
    }

    /// Documents whose `key` equals any of `values`, or is an array sharing at least one element with them
    pub fn find_any<V: Into<Value>>(&self, key: &str, values: impl IntoIterator<Item = V>) -> Result<Vec<Document>> {
        require_key(key)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Ok(Vec::new());
        }
        self.find(&Predicate::any_of(key, values), Window::ALL)
    }

    /// Documents whose `key` is an array containing every one of `values`
    pub fn find_all<V: Into<Value>>(&self, key: &str, values: impl IntoIterator<Item = V>) -> Result<Vec<Document>> {
        require_key(key)?;
        let values = values.into_iter().map(Into::into).collect();
        self.find(&Predicate::all_of(key, values), Window::ALL)
    }

    /// Run `task` on the worker pool and return a handle to its result.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use kenobi::{Database, Document};
    /// let db = Arc::new(Database::open_in_memory()?);
    /// let handle = db.execute_async({
    ///     let db = db.clone();
    ///     move || db.insert(Document::new().with("name", "Obi-Wan"))
    /// })?;
    /// handle.wait()??;
    /// # Ok::<(), kenobi::KenobiError>(())
    /// ```
    pub fn execute_async<F, R>(&self, task: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.pool.submit(task)
    }

    /// Shut down the worker pool, waiting for submitted tasks per its [`ShutdownPolicy`](crate::ShutdownPolicy).
    /// Synchronous operations keep working; the storage itself is released when the `Database` is dropped.
    pub fn close(&self) {
        self.pool.close();
        info!("Closed database at {}", self.location);
    }

    // Callers that need the rows to stay put (remove, update) already hold the lock; taking it again here is re-entrant.
    fn scan_matching(&self, predicate: &Predicate) -> Result<Vec<(RowId, Document)>> {
        let storage = self.lock();
        let mut matched = Vec::new();
        for row in storage.scan(Window::ALL)? {
            let document = codec::decode(&row.data)?;
            if predicate.evaluate(&document) {
                matched.push((row.id, document));
            }
        }
        Ok(matched)
    }

    fn find(&self, predicate: &Predicate, window: Window) -> Result<Vec<Document>> {
        let matched = self.scan_matching(predicate)?;
        debug!("{} documents match on {}", matched.len(), predicate.key());
        Ok(window.apply(matched.into_iter().map(|(_, document)| document)).collect())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("location", &self.location).field("pool", self.pool.config()).finish()
    }
}

fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KenobiError::Validation("key must be a non-empty string".to_string()));
    }
    Ok(())
}

fn equality(key: &str, value: Value) -> Result<Predicate> {
    require_key(key)?;
    if value.is_null() {
        return Err(KenobiError::Validation(format!("value to match on {} must not be null", key)));
    }
    Ok(Predicate::equals(key, value))
}

fn window(limit: Option<i64>, offset: Option<i64>) -> Result<Window> {
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(KenobiError::Validation(format!("offset must not be negative, got {}", offset)));
    }
    let limit = limit.filter(|limit| *limit > 0).map(|limit| usize::try_from(limit).unwrap_or(usize::MAX));
    Ok(Window::new(limit, usize::try_from(offset).unwrap_or(usize::MAX)))
}
