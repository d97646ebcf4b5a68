#![allow(dead_code)]

use std::str::FromStr;

use kenobi::{Database, Document};
use tempfile::TempDir;
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// A fresh file-backed database in its own temporary directory. Keep the `TempDir` alive for the test's duration.
pub fn temp_db() -> anyhow::Result<(TempDir, Database)> {
    let dir = tempfile::tempdir()?;
    let db = Database::open(dir.path().join("kenobi.db"))?;
    Ok((dir, db))
}

pub fn doc(value: serde_json::Value) -> Document { Document::try_from(value).unwrap() }

pub fn names(documents: &[Document]) -> Vec<String> {
    documents.iter().map(|d| d.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string()).collect()
}
