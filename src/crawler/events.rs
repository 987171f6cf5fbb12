//! Crawl events published to any interested listener
//!
//! Publishing is best-effort: an event is delivered at most once to each
//! subscriber that exists at send time, and a missing or lagging listener is
//! never an error for the crawl.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// An event emitted by the coordinator during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CrawlEvent {
    /// Free-form status line, e.g. `Scraping: <url>` or a page warning
    Status { message: String },

    /// Emitted after every processed page, successful or not
    #[serde(rename_all = "camelCase")]
    Progress {
        processed: usize,
        total: usize,
        current_url: String,
    },

    /// The run finished and all artifacts were written
    #[serde(rename_all = "camelCase")]
    Completed {
        total_pages: usize,
        total_assets: usize,
        screenshot_count: usize,
        output_folder: String,
    },

    /// The run was cancelled
    Cancelled,

    /// The outer crawl sequence failed
    Failed { error: String },
}

impl CrawlEvent {
    /// Creates a status event
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    /// Returns true for events that end a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled | Self::Failed { .. }
        )
    }
}

/// Fan-out channel for crawl events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CrawlEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to current subscribers
    pub fn publish(&self, event: CrawlEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No event listeners attached");
        }
    }

    /// Subscribes to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
