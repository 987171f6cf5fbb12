//! Crawler module for site traversal and mirroring
//!
//! This module contains the core crawling logic, including:
//! - The breadth-first frontier and sitemap hierarchy
//! - HTML extraction of links, assets and page metadata
//! - Deduplicated, bounded-concurrency asset downloads
//! - HTTP page loading and asset fetching
//! - Overall run coordination, events and cancellation

mod cancel;
mod capture;
mod coordinator;
mod events;
mod fetcher;
mod frontier;
mod hierarchy;
mod parser;
mod scheduler;
mod traits;

pub use cancel::CancelToken;
pub use capture::NullCapturer;
pub use coordinator::{Coordinator, CrawlStatus};
pub use events::{CrawlEvent, EventBus, DEFAULT_EVENT_CAPACITY};
pub use fetcher::{build_http_client, HttpAssetFetcher, HttpPageLoader};
pub use frontier::{Frontier, FrontierEntry, FrontierProgress, QueuedPage};
pub use hierarchy::{build_hierarchy, SitemapNode, SitemapPage, SitemapSnapshot};
pub use parser::extract_page;
pub use scheduler::{AssetKind, AssetRecord, AssetScheduler, DownloadStats};
pub use traits::{
    AssetFetcher, CaptureOptions, DiscoveredLink, ExtractedPage, NavigationGroup, PageAssets,
    PageLoader, PageMetadata, ScreenshotCapturer, ScreenshotVariant, Screenshots,
};
