//! URL handling module for Site-Mirror
//!
//! This module provides URL normalization, asset deduplication keys, host
//! comparison and exclusion-pattern matching.

mod domain;
mod matcher;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_internal, origin_of};
pub use matcher::{is_excluded, matches_wildcard};
pub use normalize::{asset_dedup_key, normalize_url};

/// Link admission decision for a discovered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClassification {
    /// Same host and not excluded - may be queued
    Crawlable,
    /// Different host - never visited
    External,
    /// Matches an exclusion pattern (or did not parse)
    Excluded,
}

impl LinkClassification {
    /// Returns true if the link may enter the frontier
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::Crawlable)
    }
}

/// Classifies a discovered link against the crawl scope
///
/// Checks are applied in priority order:
/// 1. Exclusion patterns (unparsable URLs are excluded)
/// 2. Host comparison against the base URL
///
/// # Arguments
///
/// * `raw` - The absolute link URL as discovered
/// * `base` - The crawl's base URL
/// * `patterns` - Exclusion patterns from the crawl configuration
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::{classify_link, LinkClassification};
///
/// let base = Url::parse("https://site.test/").unwrap();
/// let patterns = vec!["*/admin*".to_string()];
///
/// assert_eq!(classify_link("https://site.test/about", &base, &patterns), LinkClassification::Crawlable);
/// assert_eq!(classify_link("https://site.test/admin/", &base, &patterns), LinkClassification::Excluded);
/// assert_eq!(classify_link("https://other.test/", &base, &patterns), LinkClassification::External);
/// ```
pub fn classify_link(raw: &str, base: &Url, patterns: &[String]) -> LinkClassification {
    if is_excluded(raw, patterns) {
        return LinkClassification::Excluded;
    }

    if !is_internal(raw, base) {
        return LinkClassification::External;
    }

    LinkClassification::Crawlable
}
