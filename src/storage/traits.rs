//! Storage traits and error types
//!
//! This module defines the trait interface for the run-state store and
//! associated error types.

use crate::state::{Progress, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A crawl run as recorded in the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub start_url: String,
    pub config_hash: String,
    pub status: RunStatus,
    pub output_folder: Option<String>,
}

/// Last known state of the current or most recent run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRunState {
    pub run_id: Option<i64>,
    pub status: RunStatus,
    pub progress: Progress,
    /// RFC 3339 timestamp of the last update
    pub updated_at: String,
}

/// Trait for run-state backends
///
/// The coordinator writes through this trait at run start, after every
/// page, and at the end of the run, so that a front end can reattach.
pub trait Storage {
    // ===== Run History =====

    /// Creates a new run in `running` status
    ///
    /// # Arguments
    ///
    /// * `start_url` - The crawl's start URL
    /// * `config_hash` - Fingerprint of the effective crawl configuration
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, start_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recently started run, if any
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Records the output folder of a run
    fn set_output_folder(&mut self, run_id: i64, folder: &str) -> StorageResult<()>;

    /// Marks a run finished with a terminal status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Counts runs by status
    fn count_runs(&self, status: RunStatus) -> StorageResult<u64>;

    // ===== Run State =====

    /// Overwrites the persisted run state
    fn save_state(
        &mut self,
        run_id: Option<i64>,
        status: RunStatus,
        progress: &Progress,
    ) -> StorageResult<()>;

    /// Loads the persisted run state, `None` before the first run
    fn load_state(&self) -> StorageResult<Option<PersistedRunState>>;
}
