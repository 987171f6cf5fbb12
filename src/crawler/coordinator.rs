//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! a run, including:
//! - Guarding against concurrent runs
//! - Driving the frontier one page at a time
//! - Handing pages, screenshots and assets to the output sink
//! - Publishing progress events and persisting run state
//! - Cooperative cancellation

use crate::config::{validate_crawl_config, CrawlConfig};
use crate::crawler::cancel::CancelToken;
use crate::crawler::events::{CrawlEvent, EventBus};
use crate::crawler::frontier::{Frontier, QueuedPage};
use crate::crawler::scheduler::AssetScheduler;
use crate::crawler::traits::{
    AssetFetcher, CaptureOptions, ExtractedPage, PageLoader, ScreenshotCapturer,
};
use crate::output::{OutputSink, PageRecord, RunSummary};
use crate::state::{Progress, RunStatus};
use crate::storage::{SqliteStorage, Storage, StorageResult};
use crate::{MirrorError, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Answer to a status request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatus {
    pub running: bool,
    /// Latest progress of the active run
    pub progress: Option<Progress>,
}

/// Clears the running flag when a run ends, whatever the exit path
struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// State accumulated by the crawl loop for the run summary
#[derive(Debug, Default)]
struct RunTally {
    pages: Vec<PageRecord>,
    screenshots: usize,
}

/// Main crawler coordinator structure
///
/// One coordinator serves any number of sequential runs; at most one run is
/// active at a time.
pub struct Coordinator {
    loader: Arc<dyn PageLoader>,
    capturer: Arc<dyn ScreenshotCapturer>,
    fetcher: Arc<dyn AssetFetcher>,
    output: Arc<dyn OutputSink>,
    storage: Option<Arc<Mutex<SqliteStorage>>>,
    events: EventBus,
    running: AtomicBool,
    cancel_token: Mutex<Option<CancelToken>>,
    cancel_announced: AtomicBool,
    progress: Mutex<Progress>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `loader` - Fetches and extracts one page at a time
    /// * `capturer` - Captures screenshots when a run asks for them
    /// * `fetcher` - Downloads one asset at a time
    /// * `output` - Receives every artifact of a run
    pub fn new(
        loader: Arc<dyn PageLoader>,
        capturer: Arc<dyn ScreenshotCapturer>,
        fetcher: Arc<dyn AssetFetcher>,
        output: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            loader,
            capturer,
            fetcher,
            output,
            storage: None,
            events: EventBus::default(),
            running: AtomicBool::new(false),
            cancel_token: Mutex::new(None),
            cancel_announced: AtomicBool::new(false),
            progress: Mutex::new(Progress::default()),
        }
    }

    /// Persists run history and progress to `storage`
    pub fn with_storage(mut self, storage: Arc<Mutex<SqliteStorage>>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Subscribes to the events of this and all later runs
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.events.subscribe()
    }

    /// Returns true while a run is active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Reports whether a run is active and how far it got
    pub fn status(&self) -> CrawlStatus {
        let running = self.is_running();
        let progress = if running {
            self.progress.lock().ok().map(|p| p.clone())
        } else {
            None
        };
        CrawlStatus { running, progress }
    }

    /// Returns the cancellation flag of the active run
    ///
    /// External signals (a closed navigation surface, Ctrl-C) set this flag;
    /// the loop observes it at its next checkpoint and emits `Cancelled`.
    pub fn cancel_handle(&self) -> Option<CancelToken> {
        self.cancel_token.lock().ok().and_then(|token| token.clone())
    }

    /// Cancels the active run
    ///
    /// Does nothing when idle or once the run has settled its outcome.
    /// Otherwise sets the cancellation flag, releases the loader's navigation
    /// surface and emits `Cancelled`. A page that is already loading and
    /// downloads already in flight are allowed to finish.
    ///
    /// # Returns
    ///
    /// `true` if this call cancelled a running crawl
    pub async fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        // Flipped under the lock so it cannot race the run retiring its token
        let cancelled = match self.cancel_token.lock() {
            Ok(current) => current.as_ref().is_some_and(|token| token.cancel()),
            Err(_) => false,
        };
        if !cancelled {
            return false;
        }

        tracing::info!("Cancellation requested");
        self.loader.release().await;
        self.announce_cancelled();
        true
    }

    /// Runs one crawl to completion or cancellation
    ///
    /// The configuration is validated before any run state exists. A run
    /// that is cancelled still returns `Ok` with a partial summary whose
    /// status is `Cancelled`.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The run completed or was cancelled
    /// * `Err(MirrorError::Config)` - The configuration is invalid
    /// * `Err(MirrorError::AlreadyRunning)` - Another run is active
    /// * `Err(MirrorError)` - The outer crawl sequence failed
    pub async fn start(&self, config: CrawlConfig) -> Result<RunSummary> {
        validate_crawl_config(&config)?;
        let _guard = RunGuard::acquire(&self.running).ok_or(MirrorError::AlreadyRunning)?;

        let token = CancelToken::new();
        if let Ok(mut current) = self.cancel_token.lock() {
            *current = Some(token.clone());
        }
        self.cancel_announced.store(false, Ordering::SeqCst);
        self.set_progress(Progress::default());

        let run_id = self.record_run_start(&config);
        self.persist_state(run_id, RunStatus::Running, &Progress::default());
        tracing::info!(
            "Starting crawl of {} (max depth {})",
            config.url,
            config.max_depth
        );

        let result = self.run(&config, &token, run_id).await;

        self.loader.release().await;
        self.retire_cancel_token();

        let progress = self.current_progress();
        match result {
            Ok(summary) => {
                self.persist_state(run_id, summary.status, &progress);
                self.record_run_end(run_id, summary.status);
                Ok(summary)
            }
            Err(e) => {
                tracing::error!("Crawl failed: {}", e);
                self.events.publish(CrawlEvent::Failed {
                    error: e.to_string(),
                });
                self.persist_state(run_id, RunStatus::Failed, &progress);
                self.record_run_end(run_id, RunStatus::Failed);
                Err(e)
            }
        }
    }

    /// The outer crawl sequence; any error here fails the run
    async fn run(
        &self,
        config: &CrawlConfig,
        token: &CancelToken,
        run_id: Option<i64>,
    ) -> Result<RunSummary> {
        let output_folder = self.output.begin_run(&config.url)?;
        if let Some(id) = run_id {
            self.with_store("record output folder", |s| {
                s.set_output_folder(id, &output_folder)
            });
        }

        let mut frontier = Frontier::new(config.max_depth, config.exclude_patterns.clone());
        frontier.initialize(&config.url)?;

        let mut assets = AssetScheduler::new(config.max_concurrent_downloads);
        let mut tally = RunTally::default();
        let capture = CaptureOptions {
            desktop: config.screenshot_desktop,
            mobile: config.screenshot_mobile,
        };
        let delay = Duration::from_millis(config.crawl_delay_ms);

        while frontier.has_next() {
            // Cancellation checkpoint
            if token.is_cancelled() {
                frontier.cancel();
                break;
            }
            let Some(page) = frontier.next() else {
                break;
            };

            self.events
                .publish(CrawlEvent::status(format!("Scraping: {}", page.url)));

            match self.loader.fetch_and_extract(&page.url).await {
                Ok(extracted) => {
                    self.process_page(&mut frontier, &mut assets, &mut tally, &page, extracted, capture)
                        .await;
                }
                Err(e) => {
                    if e.is_page_level() {
                        tracing::warn!("Failed to scrape {}: {}", page.url, e);
                    } else {
                        tracing::error!("Unexpected failure on {}: {}", page.url, e);
                    }
                    self.events.publish(CrawlEvent::status(format!(
                        "Failed to scrape {}: {}",
                        page.url, e
                    )));
                }
            }

            self.report_progress(&frontier, &page.url, run_id);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let stats = if token.is_cancelled() {
            tracing::info!(
                "Crawl cancelled, skipping {} queued assets",
                assets.pending()
            );
            assets.stats()
        } else {
            self.events.publish(CrawlEvent::status(format!(
                "Downloading {} assets",
                assets.pending()
            )));
            assets.drain(self.fetcher.clone(), token).await
        };

        // From here on a cancel request is refused, so the outcome is final
        self.retire_cancel_token();
        let cancelled = token.is_cancelled();
        if cancelled {
            if !frontier.is_cancelled() {
                frontier.cancel();
            }
            self.announce_cancelled();
        }

        let snapshot = frontier.snapshot();
        let summary = RunSummary {
            scraped_at: Utc::now(),
            start_url: config.url.clone(),
            base_url: snapshot.base_url.clone(),
            status: if cancelled {
                RunStatus::Cancelled
            } else {
                RunStatus::Completed
            },
            total_pages: snapshot.total_pages,
            max_depth: config.max_depth,
            total_screenshots: tally.screenshots,
            total_assets: stats.total,
            assets: stats,
            output_folder: output_folder.clone(),
            pages: tally.pages,
        };

        let written = self
            .output
            .write_sitemap(&snapshot)
            .and_then(|_| self.output.write_run_summary(&summary));

        if cancelled {
            if let Err(e) = written {
                tracing::warn!("Failed to write partial results: {}", e);
            }
            return Ok(summary);
        }
        written?;

        tracing::info!(
            "Crawl completed: {} pages, {} assets ({} failed), {} screenshots",
            summary.total_pages,
            stats.completed(),
            stats.failed,
            summary.total_screenshots
        );
        self.events.publish(CrawlEvent::Completed {
            total_pages: summary.total_pages,
            total_assets: summary.total_assets,
            screenshot_count: summary.total_screenshots,
            output_folder,
        });

        Ok(summary)
    }

    /// Handles a successfully extracted page
    ///
    /// Artifact write failures are logged and never fail the page.
    async fn process_page(
        &self,
        frontier: &mut Frontier,
        assets: &mut AssetScheduler,
        tally: &mut RunTally,
        page: &QueuedPage,
        extracted: ExtractedPage,
        capture: CaptureOptions,
    ) {
        frontier.mark_visited(&page.url);
        tally.pages.push(PageRecord {
            url: page.url.clone(),
            title: extracted.metadata.title.clone(),
            depth: page.depth,
        });

        let added = frontier.add_discovered(&page.url, &extracted.links, page.depth);
        tracing::debug!(
            "{}: {} links, {} queued",
            page.url,
            extracted.links.len(),
            added
        );

        if let Err(e) = self.output.write_page_html(&page.url, &extracted.html) {
            tracing::warn!("Failed to save HTML of {}: {}", page.url, e);
        }
        if let Err(e) = self
            .output
            .write_page_metadata(&page.url, &extracted.metadata)
        {
            tracing::warn!("Failed to save metadata of {}: {}", page.url, e);
        }

        if capture.any() {
            match self.capturer.capture(&page.url, capture).await {
                Ok(shots) => {
                    for (variant, image) in shots.images() {
                        match self.output.write_screenshot(&page.url, image, variant) {
                            Ok(()) => tally.screenshots += 1,
                            Err(e) => tracing::warn!(
                                "Failed to save {} for {}: {}",
                                variant.file_name(),
                                page.url,
                                e
                            ),
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Screenshot failed for {}: {}", page.url, e);
                    self.events.publish(CrawlEvent::status(format!(
                        "Screenshot failed for {}: {}",
                        page.url, e
                    )));
                }
            }
        }

        let queued = assets.submit(&extracted.assets);
        if queued > 0 {
            tracing::debug!("{}: {} new assets", page.url, queued);
        }
    }

    fn report_progress(&self, frontier: &Frontier, current_url: &str, run_id: Option<i64>) {
        let counts = frontier.progress();
        let progress = Progress {
            processed: counts.processed,
            total: counts.total,
            current_url: Some(current_url.to_string()),
        };

        self.events.publish(CrawlEvent::Progress {
            processed: progress.processed,
            total: progress.total,
            current_url: current_url.to_string(),
        });
        self.persist_state(run_id, RunStatus::Running, &progress);
        self.set_progress(progress);
    }

    /// Drops the active token; later `cancel()` calls become no-ops
    fn retire_cancel_token(&self) {
        if let Ok(mut current) = self.cancel_token.lock() {
            *current = None;
        }
    }

    /// Emits `Cancelled` unless it was already emitted for this run
    fn announce_cancelled(&self) {
        if !self.cancel_announced.swap(true, Ordering::SeqCst) {
            self.events.publish(CrawlEvent::Cancelled);
        }
    }

    fn set_progress(&self, progress: Progress) {
        if let Ok(mut current) = self.progress.lock() {
            *current = progress;
        }
    }

    fn current_progress(&self) -> Progress {
        self.progress
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    // ===== Run-state persistence =====
    //
    // Persistence is best-effort: a failing store is logged and the crawl
    // carries on.

    fn with_store<F>(&self, action: &str, f: F)
    where
        F: FnOnce(&mut SqliteStorage) -> StorageResult<()>,
    {
        let Some(storage) = &self.storage else {
            return;
        };
        let result = match storage.lock() {
            Ok(mut storage) => f(&mut storage),
            Err(_) => {
                tracing::warn!("Run-state store is poisoned, cannot {}", action);
                return;
            }
        };
        if let Err(e) = result {
            tracing::warn!("Failed to {}: {}", action, e);
        }
    }

    fn record_run_start(&self, config: &CrawlConfig) -> Option<i64> {
        let storage = self.storage.as_ref()?;
        let mut storage = storage.lock().ok()?;
        match storage.create_run(&config.url, &config.fingerprint()) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to record run start: {}", e);
                None
            }
        }
    }

    fn record_run_end(&self, run_id: Option<i64>, status: RunStatus) {
        if let Some(id) = run_id {
            self.with_store("record run end", |s| s.finish_run(id, status));
        }
    }

    fn persist_state(&self, run_id: Option<i64>, status: RunStatus, progress: &Progress) {
        self.with_store("persist run state", |s| {
            s.save_state(run_id, status, progress)
        });
    }
}
