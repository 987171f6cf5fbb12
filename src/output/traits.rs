//! Output sink trait and types
//!
//! This module defines the trait interface for mirror output and the run
//! summary written at the end of a crawl.

use crate::crawler::{AssetKind, DownloadStats, PageMetadata, ScreenshotVariant, SitemapSnapshot};
use crate::state::RunStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Output folder has not been prepared")]
    NotStarted,

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A visited page as listed in the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub depth: u32,
}

/// Summary of a finished (or cancelled) run, written as `metadata.json`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub scraped_at: DateTime<Utc>,
    pub start_url: String,
    pub base_url: String,
    pub status: RunStatus,
    /// Number of visited pages
    pub total_pages: usize,
    pub max_depth: u32,
    pub total_screenshots: usize,
    /// Distinct assets accepted for download
    pub total_assets: usize,
    pub assets: DownloadStats,
    pub output_folder: String,
    pub pages: Vec<PageRecord>,
}

impl RunSummary {
    /// Returns the share of accepted assets that downloaded successfully
    pub fn asset_success_rate(&self) -> f64 {
        if self.total_assets == 0 {
            return 0.0;
        }
        (self.assets.completed() as f64 / self.total_assets as f64) * 100.0
    }
}

/// Trait for mirror output
///
/// A sink receives every artifact of a run. Page-level writes are reported
/// back to the caller, which logs and ignores their failures; sitemap and
/// summary writes end the run when they fail. Implementations must be
/// thread-safe because assets are written from concurrent download tasks.
pub trait OutputSink: Send + Sync {
    /// Prepares the output location for a new run
    ///
    /// # Arguments
    ///
    /// * `start_url` - The crawl's start URL, used to name the output folder
    ///
    /// # Returns
    ///
    /// A display form of the prepared location
    fn begin_run(&self, start_url: &str) -> OutputResult<String>;

    /// Returns the location prepared by the last `begin_run`
    fn location(&self) -> Option<String>;

    /// Writes the sitemap export
    fn write_sitemap(&self, sitemap: &SitemapSnapshot) -> OutputResult<()>;

    /// Writes the serialized document of a page
    fn write_page_html(&self, url: &str, html: &str) -> OutputResult<()>;

    /// Writes the descriptive metadata of a page
    fn write_page_metadata(&self, url: &str, metadata: &PageMetadata) -> OutputResult<()>;

    /// Writes one screenshot image of a page
    fn write_screenshot(
        &self,
        url: &str,
        image: &[u8],
        variant: ScreenshotVariant,
    ) -> OutputResult<()>;

    /// Writes a downloaded asset
    fn write_asset(&self, url: &str, bytes: &[u8], kind: AssetKind) -> OutputResult<()>;

    /// Writes the run summary
    fn write_run_summary(&self, summary: &RunSummary) -> OutputResult<()>;
}
