//! Output module for writing the mirror
//!
//! This module handles:
//! - The on-disk mirror layout (run folder, page folders, assets)
//! - The sitemap export and the run summary (`metadata.json`, `summary.md`)
//! - Status reports read back from the run-state database

mod filesystem;
mod markdown;
pub mod stats;
mod traits;

pub use filesystem::{asset_file_name, output_folder_name, url_to_folder_name, FsOutput};
pub use markdown::format_markdown_summary;
pub use stats::{load_statistics, print_statistics, RunStatistics};
pub use traits::{OutputError, OutputResult, OutputSink, PageRecord, RunSummary};
