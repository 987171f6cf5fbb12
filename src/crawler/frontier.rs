//! Breadth-first crawl frontier and sitemap graph
//!
//! The frontier owns every piece of per-run page state: the sitemap entries
//! keyed by raw URL, the visited set of normalized URLs, and the FIFO queue.
//! It is mutated only by the coordinator's sequential crawl loop.

use crate::crawler::hierarchy::{build_hierarchy, SitemapNode, SitemapPage, SitemapSnapshot};
use crate::crawler::traits::DiscoveredLink;
use crate::state::PageStatus;
use crate::url::{classify_link, normalize_url, origin_of, LinkClassification};
use crate::{UrlError, UrlResult};
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// One sitemap entry, created when its link is first accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Raw URL as first seen
    pub url: String,
    pub depth: u32,
    pub parent_url: Option<String>,
    /// Child URLs in discovery order
    pub children: Vec<String>,
    pub status: PageStatus,
    pub link_text: Option<String>,
}

/// A page waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedPage {
    pub url: String,
    pub depth: u32,
    pub parent_url: Option<String>,
}

/// Frontier counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierProgress {
    /// Entries in the sitemap
    pub total: usize,
    /// Visited pages
    pub processed: usize,
    /// Pages still queued
    pub remaining: usize,
}

/// Breadth-first frontier for a single crawl run
#[derive(Debug)]
pub struct Frontier {
    max_depth: u32,
    exclude_patterns: Vec<String>,
    start_url: String,
    base: Option<Url>,
    entries: HashMap<String, FrontierEntry>,
    order: Vec<String>,
    visited: HashSet<String>,
    discovered: HashSet<String>,
    queue: VecDeque<QueuedPage>,
    cancelled: bool,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_depth` - Deepest level that may be enqueued (root is 0)
    /// * `exclude_patterns` - Wildcard patterns for links that are never followed
    pub fn new(max_depth: u32, exclude_patterns: Vec<String>) -> Self {
        Self {
            max_depth,
            exclude_patterns,
            start_url: String::new(),
            base: None,
            entries: HashMap::new(),
            order: Vec::new(),
            visited: HashSet::new(),
            discovered: HashSet::new(),
            queue: VecDeque::new(),
            cancelled: false,
        }
    }

    /// Resets all state and seeds the root entry at depth 0
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The root is queued
    /// * `Err(UrlError)` - The start URL is not an absolute URL with a host
    pub fn initialize(&mut self, start_url: &str) -> UrlResult<()> {
        let base = Url::parse(start_url).map_err(|e| UrlError::Parse(e.to_string()))?;
        if base.host_str().is_none() {
            return Err(UrlError::MissingHost);
        }

        self.entries.clear();
        self.order.clear();
        self.visited.clear();
        self.discovered.clear();
        self.queue.clear();
        self.cancelled = false;

        self.start_url = start_url.to_string();
        self.base = Some(base);

        self.insert_entry(FrontierEntry {
            url: start_url.to_string(),
            depth: 0,
            parent_url: None,
            children: Vec::new(),
            status: PageStatus::Pending,
            link_text: None,
        });
        self.queue.push_back(QueuedPage {
            url: start_url.to_string(),
            depth: 0,
            parent_url: None,
        });

        Ok(())
    }

    /// Returns true if a page is queued and the crawl is not cancelled
    pub fn has_next(&self) -> bool {
        !self.cancelled && !self.queue.is_empty()
    }

    /// Pops the oldest queued page
    pub fn next(&mut self) -> Option<QueuedPage> {
        if self.cancelled {
            return None;
        }
        self.queue.pop_front()
    }

    /// Records a page as visited
    ///
    /// Adds the normalized URL to the visited set and flips the sitemap
    /// entry, if any, to `Visited`. Idempotent.
    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(normalize_url(url));
        if let Some(entry) = self.entries.get_mut(url) {
            entry.status = PageStatus::Visited;
        }
    }

    /// Returns true if the normalized form of `url` has been visited
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(&normalize_url(url))
    }

    /// Merges links found on a page into the frontier
    ///
    /// Nothing is added when `parent_depth` is already at the depth limit.
    /// A link is skipped when its normalized form was visited or already
    /// discovered, when it points at another host, when it matches an
    /// exclusion pattern, or when the raw URL already has an entry. Accepted
    /// links are queued in the order supplied.
    ///
    /// # Returns
    ///
    /// The number of links that were queued
    pub fn add_discovered(
        &mut self,
        parent_url: &str,
        links: &[DiscoveredLink],
        parent_depth: u32,
    ) -> usize {
        if parent_depth >= self.max_depth {
            return 0;
        }
        let Some(base) = self.base.clone() else {
            return 0;
        };

        let depth = parent_depth + 1;
        let mut accepted = 0;

        for link in links {
            let normalized = normalize_url(&link.url);
            if self.visited.contains(&normalized) || self.discovered.contains(&normalized) {
                continue;
            }

            match classify_link(&link.url, &base, &self.exclude_patterns) {
                LinkClassification::Crawlable => {}
                LinkClassification::External | LinkClassification::Excluded => continue,
            }

            if self.entries.contains_key(&link.url) {
                continue;
            }

            let link_text = Some(link.text.trim().to_string()).filter(|t| !t.is_empty());
            self.insert_entry(FrontierEntry {
                url: link.url.clone(),
                depth,
                parent_url: Some(parent_url.to_string()),
                children: Vec::new(),
                status: PageStatus::Pending,
                link_text,
            });

            match self.entries.get_mut(parent_url) {
                Some(parent) => parent.children.push(link.url.clone()),
                None => tracing::debug!("Parent {} not in sitemap, {} left unlinked", parent_url, link.url),
            }

            self.queue.push_back(QueuedPage {
                url: link.url.clone(),
                depth,
                parent_url: Some(parent_url.to_string()),
            });
            accepted += 1;
        }

        accepted
    }

    /// Rebuilds the nested page tree starting at the root
    pub fn build_hierarchy(&self) -> SitemapNode {
        build_hierarchy(&self.entries, &self.start_url)
    }

    /// Marks the crawl cancelled and drops every queued page
    ///
    /// Sitemap entries and the visited set are kept for reporting.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.queue.clear();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Exports the current sitemap state
    pub fn snapshot(&self) -> SitemapSnapshot {
        SitemapSnapshot {
            start_url: self.start_url.clone(),
            base_url: self.base.as_ref().map(origin_of).unwrap_or_default(),
            total_pages: self.visited.len(),
            max_depth: self.max_depth,
            timestamp: Utc::now(),
            hierarchy: self.build_hierarchy(),
            pages: self
                .entries_in_order()
                .map(|entry| SitemapPage {
                    url: entry.url.clone(),
                    depth: entry.depth,
                    parent: entry.parent_url.clone(),
                    status: entry.status,
                })
                .collect(),
        }
    }

    /// Returns the current counters
    pub fn progress(&self) -> FrontierProgress {
        FrontierProgress {
            total: self.entries.len(),
            processed: self.visited.len(),
            remaining: self.queue.len(),
        }
    }

    /// Returns the depth of a sitemap entry
    pub fn depth_of(&self, url: &str) -> Option<u32> {
        self.entries.get(url).map(|entry| entry.depth)
    }

    /// Looks up a sitemap entry by raw URL
    pub fn entry(&self, url: &str) -> Option<&FrontierEntry> {
        self.entries.get(url)
    }

    /// Iterates over sitemap entries in the order they were created
    pub fn entries_in_order(&self) -> impl Iterator<Item = &FrontierEntry> {
        self.order.iter().filter_map(|url| self.entries.get(url))
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    fn insert_entry(&mut self, entry: FrontierEntry) {
        self.discovered.insert(normalize_url(&entry.url));
        self.order.push(entry.url.clone());
        self.entries.insert(entry.url.clone(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "https://site.test/";

    fn links(urls: &[&str]) -> Vec<DiscoveredLink> {
        urls.iter().map(|u| DiscoveredLink::new(*u)).collect()
    }

    fn create_test_frontier(max_depth: u32) -> Frontier {
        let mut frontier = Frontier::new(max_depth, vec!["*/admin*".to_string()]);
        frontier.initialize(ROOT).unwrap();
        frontier
    }

    #[test]
    fn test_initialize_seeds_root() {
        let mut frontier = create_test_frontier(2);

        assert!(frontier.has_next());
        let root = frontier.next().unwrap();
        assert_eq!(root.url, ROOT);
        assert_eq!(root.depth, 0);
        assert_eq!(root.parent_url, None);
        assert_eq!(frontier.entry(ROOT).unwrap().status, PageStatus::Pending);
        assert!(!frontier.has_next());
    }

    #[test]
    fn test_initialize_rejects_invalid_url() {
        let mut frontier = Frontier::new(2, vec![]);
        assert!(matches!(
            frontier.initialize("not a url"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_initialize_resets_state() {
        let mut frontier = create_test_frontier(2);
        frontier.next();
        frontier.mark_visited(ROOT);
        frontier.add_discovered(ROOT, &links(&["https://site.test/a"]), 0);
        frontier.cancel();

        frontier.initialize(ROOT).unwrap();

        assert!(frontier.has_next());
        assert_eq!(frontier.progress().total, 1);
        assert_eq!(frontier.progress().processed, 0);
        assert!(!frontier.is_visited(ROOT));
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = create_test_frontier(3);
        frontier.next();
        frontier.mark_visited(ROOT);
        frontier.add_discovered(
            ROOT,
            &links(&["https://site.test/b", "https://site.test/a"]),
            0,
        );

        assert_eq!(frontier.next().unwrap().url, "https://site.test/b");
        assert_eq!(frontier.next().unwrap().url, "https://site.test/a");
        assert!(frontier.next().is_none());
    }

    #[test]
    fn test_mark_visited_is_idempotent() {
        let mut frontier = create_test_frontier(2);
        frontier.mark_visited(ROOT);
        frontier.mark_visited(ROOT);

        assert_eq!(frontier.progress().processed, 1);
        assert_eq!(frontier.entry(ROOT).unwrap().status, PageStatus::Visited);
    }

    #[test]
    fn test_mark_visited_unknown_url_only_updates_visited_set() {
        let mut frontier = create_test_frontier(2);
        frontier.mark_visited("https://site.test/elsewhere/");

        assert!(frontier.is_visited("https://site.test/elsewhere"));
        assert!(frontier.entry("https://site.test/elsewhere/").is_none());
    }

    #[test]
    fn test_depth_limit_scenario() {
        // root -> X, Y; X -> Z with max depth 1
        let mut frontier = create_test_frontier(1);
        let mut visited_order = Vec::new();

        while let Some(page) = frontier.next() {
            frontier.mark_visited(&page.url);
            visited_order.push(page.url.clone());
            let found = match page.url.as_str() {
                ROOT => links(&["https://site.test/x", "https://site.test/y"]),
                "https://site.test/x" => links(&["https://site.test/z"]),
                _ => vec![],
            };
            frontier.add_discovered(&page.url, &found, page.depth);
        }

        assert_eq!(
            visited_order,
            vec![ROOT, "https://site.test/x", "https://site.test/y"]
        );
        assert!(frontier.entry("https://site.test/z").is_none());
        assert!(frontier.entries_in_order().all(|e| e.depth <= 1));
    }

    #[test]
    fn test_child_depth_is_parent_plus_one() {
        let mut frontier = create_test_frontier(5);
        frontier.add_discovered(ROOT, &links(&["https://site.test/a"]), 0);
        frontier.add_discovered("https://site.test/a", &links(&["https://site.test/a/b"]), 1);

        for entry in frontier.entries_in_order() {
            if let Some(parent) = &entry.parent_url {
                assert_eq!(entry.depth, frontier.depth_of(parent).unwrap() + 1);
            }
        }
    }

    #[test]
    fn test_excluded_link_never_added() {
        let mut frontier = create_test_frontier(3);
        let added = frontier.add_discovered(ROOT, &links(&["https://site.test/admin/x"]), 0);

        assert_eq!(added, 0);
        assert!(frontier.entry("https://site.test/admin/x").is_none());
        assert_eq!(frontier.progress().remaining, 1);
    }

    #[test]
    fn test_external_link_never_added() {
        let mut frontier = create_test_frontier(3);
        assert_eq!(
            frontier.add_discovered(ROOT, &links(&["https://other.test/page"]), 0),
            0
        );
    }

    #[test]
    fn test_visited_variants_not_requeued() {
        let mut frontier = create_test_frontier(3);
        frontier.next();
        frontier.mark_visited(ROOT);

        let added = frontier.add_discovered(
            ROOT,
            &links(&["https://site.test/#top", "https://site.test"]),
            0,
        );
        assert_eq!(added, 0);
        assert!(!frontier.has_next());
    }

    #[test]
    fn test_pending_variants_collapse() {
        let mut frontier = create_test_frontier(3);
        let added = frontier.add_discovered(
            ROOT,
            &links(&[
                "https://site.test/docs",
                "https://site.test/docs/",
                "https://site.test/docs#intro",
            ]),
            0,
        );

        assert_eq!(added, 1);
        assert_eq!(frontier.entry(ROOT).unwrap().children, vec!["https://site.test/docs"]);
    }

    #[test]
    fn test_duplicate_raw_link_added_once() {
        let mut frontier = create_test_frontier(3);
        frontier.add_discovered(ROOT, &links(&["https://site.test/a"]), 0);
        frontier.add_discovered(ROOT, &links(&["https://site.test/a"]), 0);

        assert_eq!(frontier.entry(ROOT).unwrap().children.len(), 1);
        assert_eq!(frontier.progress().total, 2);
    }

    #[test]
    fn test_unknown_parent_still_queues() {
        let mut frontier = create_test_frontier(3);
        let added = frontier.add_discovered("https://site.test/ghost", &links(&["https://site.test/a"]), 0);

        assert_eq!(added, 1);
        assert_eq!(frontier.depth_of("https://site.test/a"), Some(1));
        assert!(frontier.build_hierarchy().children.is_empty());
    }

    #[test]
    fn test_link_text_recorded() {
        let mut frontier = create_test_frontier(3);
        let link = DiscoveredLink {
            url: "https://site.test/about".to_string(),
            text: "  About us ".to_string(),
            title: String::new(),
        };
        frontier.add_discovered(ROOT, &[link], 0);

        assert_eq!(
            frontier.entry("https://site.test/about").unwrap().link_text.as_deref(),
            Some("About us")
        );
    }

    #[test]
    fn test_cancel_clears_queue_and_keeps_visited() {
        let mut frontier = create_test_frontier(3);
        frontier.next();
        frontier.mark_visited(ROOT);
        frontier.add_discovered(
            ROOT,
            &links(&["https://site.test/a", "https://site.test/b"]),
            0,
        );

        frontier.cancel();

        assert!(!frontier.has_next());
        assert!(frontier.next().is_none());
        assert_eq!(frontier.progress().remaining, 0);
        assert_eq!(frontier.entry(ROOT).unwrap().status, PageStatus::Visited);
        assert_eq!(frontier.progress().total, 3);
    }

    #[test]
    fn test_hierarchy_matches_discovery() {
        let mut frontier = create_test_frontier(3);
        frontier.add_discovered(ROOT, &links(&["https://site.test/b"]), 0);
        frontier.add_discovered("https://site.test/b", &links(&["https://site.test/c"]), 1);

        let tree = frontier.build_hierarchy();
        assert_eq!(tree.url, ROOT);
        assert_eq!(tree.children[0].url, "https://site.test/b");
        assert_eq!(tree.children[0].children[0].url, "https://site.test/c");
        assert!(tree.children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_snapshot_contents() {
        let mut frontier = create_test_frontier(2);
        frontier.next();
        frontier.mark_visited(ROOT);
        frontier.add_discovered(ROOT, &links(&["https://site.test/a"]), 0);

        let snapshot = frontier.snapshot();
        assert_eq!(snapshot.start_url, ROOT);
        assert_eq!(snapshot.base_url, "https://site.test");
        assert_eq!(snapshot.total_pages, 1);
        assert_eq!(snapshot.max_depth, 2);
        assert_eq!(snapshot.pages.len(), 2);
        assert_eq!(snapshot.pages[1].parent.as_deref(), Some(ROOT));
        assert_eq!(snapshot.pages[1].status, PageStatus::Pending);

        // Later mutation does not affect an earlier snapshot
        frontier.mark_visited("https://site.test/a");
        assert_eq!(snapshot.total_pages, 1);
    }
}
