//! Asset cache and bounded-concurrency download scheduler
//!
//! This module handles:
//! - Deduplicating asset URLs by origin + path across the whole run
//! - Queueing accepted assets in submission order
//! - Draining the queue with at most `max_concurrent` downloads in flight
//! - Stopping the drain early when the run is cancelled
//! - Counting successful downloads per kind and failures

use crate::crawler::cancel::CancelToken;
use crate::crawler::traits::{AssetFetcher, PageAssets};
use crate::url::asset_dedup_key;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Kind of a downloadable asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Stylesheet,
    Script,
    Font,
}

impl AssetKind {
    /// Subfolder of `assets/` that holds this kind
    pub fn subfolder(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Stylesheet => "css",
            Self::Script => "js",
            Self::Font => "fonts",
        }
    }
}

/// One asset scheduled for download
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetRecord {
    /// Deduplicated URL (origin + path)
    pub url: String,
    pub kind: AssetKind,
}

/// Download counters for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    /// Distinct assets accepted for download
    pub total: usize,
    pub images: usize,
    pub stylesheets: usize,
    pub scripts: usize,
    pub fonts: usize,
    pub failed: usize,
}

impl DownloadStats {
    /// Number of successful downloads across all kinds
    pub fn completed(&self) -> usize {
        self.images + self.stylesheets + self.scripts + self.fonts
    }
}

#[derive(Debug, Default)]
struct Counters {
    images: AtomicUsize,
    stylesheets: AtomicUsize,
    scripts: AtomicUsize,
    fonts: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn record_success(&self, kind: AssetKind) {
        let counter = match kind {
            AssetKind::Image => &self.images,
            AssetKind::Stylesheet => &self.stylesheets,
            AssetKind::Script => &self.scripts,
            AssetKind::Font => &self.fonts,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deduplicating asset queue with a bounded download pool
pub struct AssetScheduler {
    max_concurrent: usize,
    seen: HashSet<String>,
    queue: VecDeque<AssetRecord>,
    counters: Arc<Counters>,
}

impl AssetScheduler {
    /// Creates a scheduler allowing `max_concurrent` downloads at once
    ///
    /// A limit of 0 is treated as 1.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            seen: HashSet::new(),
            queue: VecDeque::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Adds a page's assets to the queue
    ///
    /// Each URL is reduced to its dedup key; keys seen earlier in the run
    /// are skipped, and `data:`/`blob:`/`javascript:` or unparsable URLs
    /// are dropped silently.
    ///
    /// # Returns
    ///
    /// The number of newly queued assets
    pub fn submit(&mut self, assets: &PageAssets) -> usize {
        let groups = [
            (&assets.images, AssetKind::Image),
            (&assets.stylesheets, AssetKind::Stylesheet),
            (&assets.scripts, AssetKind::Script),
            (&assets.fonts, AssetKind::Font),
        ];

        let mut queued = 0;
        for (urls, kind) in groups {
            for raw in urls {
                let Some(key) = asset_dedup_key(raw) else {
                    continue;
                };
                if self.seen.insert(key.clone()) {
                    self.queue.push_back(AssetRecord { url: key, kind });
                    queued += 1;
                }
            }
        }

        queued
    }

    /// Number of assets waiting for download
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Downloads every queued asset and waits for all of them to settle
    ///
    /// At most `max_concurrent` downloads run at any instant; a new one
    /// starts as soon as a permit is released. A failed or panicking
    /// download is logged and counted, never aborts the drain.
    ///
    /// Once `cancel` is set no further download starts. Downloads already
    /// in flight are awaited, and the skipped assets stay queued.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Downloads and stores a single asset
    /// * `cancel` - Cancellation flag of the run
    ///
    /// # Returns
    ///
    /// The counters after the drain
    pub async fn drain(
        &mut self,
        fetcher: Arc<dyn AssetFetcher>,
        cancel: &CancelToken,
    ) -> DownloadStats {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(self.queue.len());

        tracing::info!(
            "Downloading {} assets ({} at a time)",
            self.queue.len(),
            self.max_concurrent
        );

        while let Some(record) = self.queue.pop_front() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Download semaphore closed; {} assets left", self.queue.len() + 1);
                    self.counters.record_failure();
                    continue;
                }
            };

            // Checked after the wait so a cancel during a full pool is seen
            if cancel.is_cancelled() {
                self.queue.push_front(record);
                tracing::info!(
                    "Downloads cancelled, skipping {} queued assets",
                    self.queue.len()
                );
                break;
            }

            let fetcher = fetcher.clone();
            let counters = self.counters.clone();

            handles.push(tokio::spawn(async move {
                // Permit is released when the task finishes
                let _permit = permit;

                match fetcher.fetch(&record).await {
                    Ok(()) => {
                        tracing::debug!("Downloaded {}", record.url);
                        counters.record_success(record.kind);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to download {}: {}", record.url, e);
                        counters.record_failure();
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Download task panicked: {}", e);
                self.counters.record_failure();
            }
        }

        self.stats()
    }

    /// Returns the current counters
    pub fn stats(&self) -> DownloadStats {
        DownloadStats {
            total: self.seen.len(),
            images: self.counters.images.load(Ordering::SeqCst),
            stylesheets: self.counters.stylesheets.load(Ordering::SeqCst),
            scripts: self.counters.scripts.load(Ordering::SeqCst),
            fonts: self.counters.fonts.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }
}

impl Default for AssetScheduler {
    fn default() -> Self {
        Self::new(3)
    }
}
