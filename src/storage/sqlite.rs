//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{Progress, RunStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    PersistedRunState, RunRecord, Storage, StorageError, StorageResult,
};
use crate::MirrorError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, start_url, config_hash, status, output_folder";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// The parent directory of `path` is created if it does not exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(MirrorError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, MirrorError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, MirrorError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_status(column: &'static str, value: String) -> StorageResult<RunStatus> {
    RunStatus::from_db_string(&value).ok_or(StorageError::Corrupt { column, value })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let status: String = row.get(5)?;
    Ok((
        RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            start_url: row.get(3)?,
            config_hash: row.get(4)?,
            // Replaced below once the status string has been validated
            status: RunStatus::Idle,
            output_folder: row.get(6)?,
        },
        status,
    ))
}

fn finish_record((mut run, status): (RunRecord, String)) -> StorageResult<RunRecord> {
    run.status = parse_status("runs.status", status)?;
    Ok(run)
}

impl Storage for SqliteStorage {
    // ===== Run History =====

    fn create_run(&mut self, start_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, start_url, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, start_url, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        finish_record(raw)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, [], run_from_row)
            .optional()?
            .map(finish_record)
            .transpose()
    }

    fn set_output_folder(&mut self, run_id: i64, folder: &str) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET output_folder = ?1 WHERE id = ?2",
            params![folder, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self, status: RunStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Run State =====

    fn save_state(
        &mut self,
        run_id: Option<i64>,
        status: RunStatus,
        progress: &Progress,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO run_state (id, run_id, status, processed, total, current_url, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                run_id = excluded.run_id,
                status = excluded.status,
                processed = excluded.processed,
                total = excluded.total,
                current_url = excluded.current_url,
                updated_at = excluded.updated_at",
            params![
                run_id,
                status.to_db_string(),
                progress.processed as i64,
                progress.total as i64,
                progress.current_url,
                now
            ],
        )?;
        Ok(())
    }

    fn load_state(&self) -> StorageResult<Option<PersistedRunState>> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, status, processed, total, current_url, updated_at
                 FROM run_state WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, Option<i64>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((run_id, status, processed, total, current_url, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(PersistedRunState {
            run_id,
            status: parse_status("run_state.status", status)?,
            progress: Progress {
                processed: processed.max(0) as usize,
                total: total.max(0) as usize,
                current_url,
            },
            updated_at,
        }))
    }
}
