use crate::error::StorageError;

/// Identifier the backend assigns to a stored row. Never part of the document itself.
pub type RowId = i64;

/// One row as held by a backend: the row id and the encoded document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: RowId,
    pub data: String,
}

/// A pagination window over rows in scan order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    /// `None` is unbounded
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Window {
    pub const ALL: Window = Window { limit: None, offset: 0 };

    pub fn new(limit: Option<usize>, offset: usize) -> Self { Self { limit, offset } }

    pub fn is_all(&self) -> bool { *self == Self::ALL }

    pub fn apply<I: Iterator>(&self, iter: I) -> impl Iterator<Item = I::Item> { iter.skip(self.offset).take(self.limit.unwrap_or(usize::MAX)) }
}

/// A single-table store of encoded documents.
///
/// Rows are returned in insertion order. Every mutating call is atomic: it either commits completely or leaves the
/// table unchanged. Implementations are not required to be `Sync`; callers serialize access.
pub trait StorageEngine: Send {
    fn insert(&self, data: &str) -> Result<RowId, StorageError>;

    /// Insert all rows as one unit
    fn insert_many(&self, data: &[String]) -> Result<usize, StorageError>;

    fn scan(&self, window: Window) -> Result<Vec<StoredDocument>, StorageError>;

    /// Overwrite the payload of each listed row as one unit
    fn replace(&self, rows: &[StoredDocument]) -> Result<usize, StorageError>;

    /// Delete the listed rows as one unit
    fn delete(&self, ids: &[RowId]) -> Result<usize, StorageError>;

    fn purge(&self) -> Result<usize, StorageError>;

    fn count(&self) -> Result<u64, StorageError>;
}
