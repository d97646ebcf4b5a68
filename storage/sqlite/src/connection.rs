//! Opening and configuring rusqlite connections

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::SqliteError;

/// Default time a writer waits on another connection's lock before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for SQLite connections
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqliteConfig {
    /// File-based database
    File(PathBuf),
    /// In-memory database (for testing)
    Memory,
}

impl SqliteConfig {
    /// A file-based database. A leading `~` is expanded to the home directory.
    pub fn file(path: impl AsRef<Path>) -> Self { SqliteConfig::File(expand_home(path.as_ref())) }

    pub fn location(&self) -> String {
        match self {
            SqliteConfig::File(path) => path.display().to_string(),
            SqliteConfig::Memory => ":memory:".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqliteOptions {
    pub busy_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self { Self { busy_timeout: DEFAULT_BUSY_TIMEOUT } }
}

/// Open a connection and apply pragmas. Any failure here means the store is unusable.
pub(crate) fn open_connection(config: &SqliteConfig, options: &SqliteOptions) -> Result<Connection, SqliteError> {
    let unavailable = |source| SqliteError::Unavailable { location: config.location(), source };

    let conn = match config {
        SqliteConfig::File(path) => Connection::open(path),
        SqliteConfig::Memory => Connection::open_in_memory(),
    }
    .map_err(unavailable)?;

    conn.busy_timeout(options.busy_timeout).map_err(unavailable)?;

    // WAL lets readers proceed while a writer appends
    let journal_mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0)).map_err(unavailable)?;
    conn.execute_batch(
        "PRAGMA synchronous=NORMAL;
         PRAGMA temp_store=MEMORY;",
    )
    .map_err(unavailable)?;

    match config {
        SqliteConfig::File(_) if !journal_mode.eq_ignore_ascii_case("wal") => {
            warn!("SQLite database at {} is using journal mode {} instead of WAL", config.location(), journal_mode);
        }
        _ => debug!("SQLite journal mode for {}: {}", config.location(), journal_mode),
    }

    Ok(conn)
}

pub(crate) fn journal_mode(conn: &Connection) -> Result<String, rusqlite::Error> {
    conn.pragma_query_value(None, "journal_mode", |row| row.get(0))
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
