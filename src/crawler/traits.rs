//! Collaborator seams used by the coordinator
//!
//! The crawl engine never talks to the network, a browser, or the disk
//! directly. Page loading, screenshot capture and asset downloads all go
//! through the traits defined here.

use crate::crawler::scheduler::AssetRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    /// Absolute URL of the link target
    pub url: String,
    /// Trimmed anchor text
    pub text: String,
    /// Value of the `title` attribute, empty when absent
    pub title: String,
}

impl DiscoveredLink {
    /// Creates a link with no text or title
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: String::new(),
            title: String::new(),
        }
    }
}

/// Asset URLs referenced by a page, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAssets {
    pub images: Vec<String>,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
    pub fonts: Vec<String>,
}

impl PageAssets {
    /// Total number of referenced URLs, duplicates included
    pub fn len(&self) -> usize {
        self.images.len() + self.stylesheets.len() + self.scripts.len() + self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A group of links found inside a navigation element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationGroup {
    /// The selector that matched the navigation element
    pub selector: String,
    pub links: Vec<DiscoveredLink>,
}

/// Descriptive metadata of a page, written as `page-metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub title: String,
    pub meta_description: String,
    pub meta_keywords: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub h1_tags: Vec<String>,
    pub word_count: usize,
    pub image_count: usize,
    pub navigation: Vec<NavigationGroup>,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

impl PageMetadata {
    /// Creates empty metadata for a URL, stamped with the current time
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            meta_description: String::new(),
            meta_keywords: String::new(),
            og_title: String::new(),
            og_description: String::new(),
            og_image: String::new(),
            h1_tags: Vec::new(),
            word_count: 0,
            image_count: 0,
            navigation: Vec::new(),
            url: url.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything a page loader returns for one page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// URL after redirects
    pub final_url: String,
    /// Full serialized document
    pub html: String,
    pub links: Vec<DiscoveredLink>,
    pub assets: PageAssets,
    pub metadata: PageMetadata,
}

/// Which screenshot variants to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureOptions {
    pub desktop: bool,
    pub mobile: bool,
}

impl CaptureOptions {
    /// Returns true if at least one variant is requested
    pub fn any(&self) -> bool {
        self.desktop || self.mobile
    }
}

/// Screenshot viewport variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenshotVariant {
    Desktop,
    Mobile,
}

impl ScreenshotVariant {
    /// Viewport size (width, height) in CSS pixels
    pub fn viewport(&self) -> (u32, u32) {
        match self {
            Self::Desktop => (1920, 1080),
            Self::Mobile => (375, 812),
        }
    }

    /// File name used for this variant inside a page folder
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Desktop => "screenshot-desktop.png",
            Self::Mobile => "screenshot-mobile.png",
        }
    }
}

/// PNG images produced by a capturer; `None` for variants not captured
#[derive(Debug, Clone, Default)]
pub struct Screenshots {
    pub desktop: Option<Vec<u8>>,
    pub mobile: Option<Vec<u8>>,
}

impl Screenshots {
    /// Iterates over the captured images with their variant
    pub fn images(&self) -> impl Iterator<Item = (ScreenshotVariant, &[u8])> {
        [
            (ScreenshotVariant::Desktop, self.desktop.as_deref()),
            (ScreenshotVariant::Mobile, self.mobile.as_deref()),
        ]
        .into_iter()
        .filter_map(|(variant, bytes)| bytes.map(|b| (variant, b)))
    }
}

/// Loads a page and extracts its content
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Fetches `url` and extracts links, assets and metadata
    ///
    /// Errors are page-level: `Extraction` or `LoadTimeout`.
    async fn fetch_and_extract(&self, url: &str) -> crate::Result<ExtractedPage>;

    /// Releases the navigation surface, if any
    ///
    /// Called on every exit path of a run; must be safe to call repeatedly.
    async fn release(&self) {}
}

/// Captures rendered screenshots of a page
#[async_trait]
pub trait ScreenshotCapturer: Send + Sync {
    async fn capture(&self, url: &str, options: CaptureOptions) -> crate::Result<Screenshots>;
}

/// Downloads one asset and stores it
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, record: &AssetRecord) -> crate::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_assets_len() {
        let assets = PageAssets {
            images: vec!["a".to_string(), "b".to_string()],
            stylesheets: vec!["c".to_string()],
            scripts: vec![],
            fonts: vec!["d".to_string()],
        };
        assert_eq!(assets.len(), 4);
        assert!(!assets.is_empty());
        assert!(PageAssets::default().is_empty());
    }

    #[test]
    fn test_capture_options_any() {
        assert!(!CaptureOptions::default().any());
        assert!(CaptureOptions {
            desktop: false,
            mobile: true
        }
        .any());
    }

    #[test]
    fn test_screenshots_images_skips_missing() {
        let shots = Screenshots {
            desktop: None,
            mobile: Some(vec![1, 2, 3]),
        };
        let images: Vec<_> = shots.images().collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].0, ScreenshotVariant::Mobile);
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = PageMetadata::empty("https://site.test/");
        let json = serde_json::to_value(&metadata).unwrap();
        assert!(json.get("metaDescription").is_some());
        assert!(json.get("h1Tags").is_some());
    }
}
