use std::path::Path;
use std::time::Duration;

use kenobi_storage_sqlite::{SqliteConfig, SqliteOptions};

/// Default number of worker threads for [`Database::execute_async`](crate::Database::execute_async)
pub const DEFAULT_POOL_SIZE: usize = 5;

/// What [`WorkerPool::close`](crate::WorkerPool::close) does with tasks that are still queued
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Run every queued task, then wait for all of them
    #[default]
    Wait,
    /// Cancel tasks that have not started; wait only for running ones
    CancelPending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub capacity: usize,
    pub shutdown: ShutdownPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self { Self { capacity: DEFAULT_POOL_SIZE, shutdown: ShutdownPolicy::default() } }
}

/// Everything needed to open a [`Database`](crate::Database)
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub storage: SqliteConfig,
    pub sqlite: SqliteOptions,
    pub pool: PoolConfig,
}

impl DatabaseConfig {
    pub fn new(storage: SqliteConfig) -> Self { Self { storage, sqlite: SqliteOptions::default(), pool: PoolConfig::default() } }

    /// A file-based database. A leading `~` is expanded to the home directory.
    pub fn file(path: impl AsRef<Path>) -> Self { Self::new(SqliteConfig::file(path)) }

    pub fn memory() -> Self { Self::new(SqliteConfig::Memory) }

    pub fn pool_size(mut self, capacity: usize) -> Self {
        self.pool.capacity = capacity;
        self
    }

    pub fn shutdown_policy(mut self, shutdown: ShutdownPolicy) -> Self {
        self.pool.shutdown = shutdown;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.sqlite.busy_timeout = timeout;
        self
    }
}
