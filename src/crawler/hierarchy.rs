//! Sitemap tree reconstruction and export types

use crate::crawler::frontier::FrontierEntry;
use crate::state::PageStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One node of the reconstructed page tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapNode {
    pub url: String,
    pub depth: u32,
    pub link_text: String,
    pub children: Vec<SitemapNode>,
}

/// Flat view of one sitemap entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapPage {
    pub url: String,
    pub depth: u32,
    pub parent: Option<String>,
    pub status: PageStatus,
}

/// Point-in-time export of the frontier, written as `sitemap.json`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapSnapshot {
    pub start_url: String,
    /// Origin of the start URL
    pub base_url: String,
    /// Number of visited pages
    pub total_pages: usize,
    pub max_depth: u32,
    pub timestamp: DateTime<Utc>,
    pub hierarchy: SitemapNode,
    pub pages: Vec<SitemapPage>,
}

/// Rebuilds the nested page tree from the flat entry map
///
/// Children are visited in discovery order. A child reference with no
/// entry is skipped, and a URL already placed in the tree is never placed
/// again, so malformed parent/child bookkeeping truncates the tree instead
/// of looping.
///
/// # Arguments
///
/// * `entries` - Sitemap entries keyed by raw URL
/// * `root_url` - Key of the root entry
///
/// # Returns
///
/// The tree rooted at `root_url`, or a bare depth-0 node if the root has no
/// entry.
pub fn build_hierarchy(entries: &HashMap<String, FrontierEntry>, root_url: &str) -> SitemapNode {
    let mut placed = HashSet::new();

    build_node(entries, root_url, &mut placed).unwrap_or_else(|| SitemapNode {
        url: root_url.to_string(),
        depth: 0,
        link_text: String::new(),
        children: Vec::new(),
    })
}

fn build_node<'a>(
    entries: &'a HashMap<String, FrontierEntry>,
    url: &'a str,
    placed: &mut HashSet<&'a str>,
) -> Option<SitemapNode> {
    let entry = entries.get(url)?;
    if !placed.insert(entry.url.as_str()) {
        tracing::debug!("Sitemap cycle truncated at {}", url);
        return None;
    }

    let children = entry
        .children
        .iter()
        .filter_map(|child| build_node(entries, child, placed))
        .collect();

    Some(SitemapNode {
        url: entry.url.clone(),
        depth: entry.depth,
        link_text: entry.link_text.clone().unwrap_or_default(),
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, depth: u32, parent: Option<&str>, children: &[&str]) -> FrontierEntry {
        FrontierEntry {
            url: url.to_string(),
            depth,
            parent_url: parent.map(str::to_string),
            children: children.iter().map(|c| c.to_string()).collect(),
            status: PageStatus::Pending,
            link_text: None,
        }
    }

    fn map(entries: Vec<FrontierEntry>) -> HashMap<String, FrontierEntry> {
        entries.into_iter().map(|e| (e.url.clone(), e)).collect()
    }

    #[test]
    fn test_linear_chain() {
        let entries = map(vec![
            entry("A", 0, None, &["B"]),
            entry("B", 1, Some("A"), &["C"]),
            entry("C", 2, Some("B"), &[]),
        ]);

        let tree = build_hierarchy(&entries, "A");

        assert_eq!(tree.url, "A");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].url, "B");
        assert_eq!(tree.children[0].children[0].url, "C");
        assert!(tree.children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_children_keep_discovery_order() {
        let entries = map(vec![
            entry("A", 0, None, &["Y", "X"]),
            entry("X", 1, Some("A"), &[]),
            entry("Y", 1, Some("A"), &[]),
        ]);

        let tree = build_hierarchy(&entries, "A");
        let urls: Vec<_> = tree.children.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["Y", "X"]);
    }

    #[test]
    fn test_dangling_child_is_skipped() {
        let entries = map(vec![entry("A", 0, None, &["missing", "B"]), entry("B", 1, Some("A"), &[])]);

        let tree = build_hierarchy(&entries, "A");
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].url, "B");
    }

    #[test]
    fn test_cycle_is_truncated() {
        let entries = map(vec![
            entry("A", 0, None, &["B"]),
            entry("B", 1, Some("A"), &["A", "B"]),
        ]);

        let tree = build_hierarchy(&entries, "A");
        assert_eq!(tree.children.len(), 1);
        assert!(tree.children[0].children.is_empty());
    }

    #[test]
    fn test_missing_root_yields_bare_node() {
        let tree = build_hierarchy(&HashMap::new(), "https://site.test/");
        assert_eq!(tree.url, "https://site.test/");
        assert_eq!(tree.depth, 0);
        assert!(tree.children.is_empty());
    }
}
