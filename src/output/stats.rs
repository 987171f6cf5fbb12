//! Run status reporting from the run-state database
//!
//! This module backs the `--status` flag: it reads the persisted state and
//! run history and prints them for a front end or an operator.

use crate::state::{Progress, RunStatus};
use crate::storage::{RunRecord, Storage};
use crate::MirrorError;

/// Snapshot of the run-state database
#[derive(Debug, Clone, PartialEq)]
pub struct RunStatistics {
    /// Status of the current or most recent run
    pub status: RunStatus,

    /// Last persisted progress
    pub progress: Progress,

    /// When the state was last written
    pub updated_at: Option<String>,

    /// The most recently started run
    pub latest_run: Option<RunRecord>,

    /// Number of runs that completed
    pub completed_runs: u64,

    /// Number of runs that were cancelled or failed
    pub unsuccessful_runs: u64,
}

/// Loads run statistics from storage
///
/// An empty database reports an idle crawler with zero progress.
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Successfully loaded statistics
/// * `Err(MirrorError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<RunStatistics, MirrorError> {
    let state = storage.load_state()?;
    let latest_run = storage.get_latest_run()?;

    let completed_runs = storage.count_runs(RunStatus::Completed)?;
    let unsuccessful_runs =
        storage.count_runs(RunStatus::Cancelled)? + storage.count_runs(RunStatus::Failed)?;

    let (status, progress, updated_at) = match state {
        Some(state) => (state.status, state.progress, Some(state.updated_at)),
        None => (RunStatus::Idle, Progress::default(), None),
    };

    Ok(RunStatistics {
        status,
        progress,
        updated_at,
        latest_run,
        completed_runs,
        unsuccessful_runs,
    })
}

/// Prints run statistics to stdout
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Site Mirror Status ===\n");

    println!("State: {}", stats.status);
    println!(
        "Progress: {} / {} pages ({}%)",
        stats.progress.processed,
        stats.progress.total,
        stats.progress.percent()
    );
    if let Some(url) = &stats.progress.current_url {
        println!("Current page: {}", url);
    }
    if let Some(updated_at) = &stats.updated_at {
        println!("Last update: {}", updated_at);
    }
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest run (#{}):", run.id);
        println!("  Start URL: {}", run.start_url);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status);
        if let Some(folder) = &run.output_folder {
            println!("  Output: {}", folder);
        }
        println!();
    }

    println!(
        "History: {} completed, {} cancelled or failed",
        stats.completed_runs, stats.unsuccessful_runs
    );
}
