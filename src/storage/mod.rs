//! Storage module for persisting run state
//!
//! This module keeps the run history and the last known progress of the
//! current run in SQLite, so that a front end (or `--status`) can reattach
//! after a restart:
//! - SQLite database initialization and schema management
//! - Run history with start URL, configuration fingerprint and final status
//! - A single-row snapshot of status and progress

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PersistedRunState, RunRecord, Storage, StorageError, StorageResult};

use crate::MirrorError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(MirrorError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, MirrorError> {
    SqliteStorage::new(path)
}
