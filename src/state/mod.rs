//! State module for tracking crawl progress
//!
//! This module provides the status types shared by the frontier, the
//! coordinator and the run-state store.
//!
//! # Components
//!
//! - `PageStatus`: Tracks whether a sitemap entry is still pending or visited
//! - `RunStatus`: Lifecycle of a crawl run (idle, running, completed, ...)
//! - `Progress`: Processed/total counters reported after every page

mod page_state;
mod run_state;

// Re-export main types
pub use page_state::PageStatus;
pub use run_state::{Progress, RunStatus};
