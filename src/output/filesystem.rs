//! Filesystem output sink
//!
//! Writes the mirror layout below a root directory:
//!
//! ```text
//! <host-with-dashes>_<YYYY-MM-DD_HH-MM>/
//!   sitemap.json
//!   metadata.json
//!   summary.md
//!   <page-folder>/index.html
//!   <page-folder>/page-metadata.json
//!   <page-folder>/screenshot-desktop.png
//!   <page-folder>/screenshot-mobile.png
//!   assets/{images,css,js,fonts}/<stem>-<url hash>.<ext>
//! ```

use crate::crawler::{AssetKind, PageMetadata, ScreenshotVariant, SitemapSnapshot};
use crate::output::markdown::format_markdown_summary;
use crate::output::traits::{OutputError, OutputResult, OutputSink, RunSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use url::Url;

/// Builds the run folder name from the start URL and a timestamp
///
/// Dots in the host become dashes; an unparsable URL yields `scraped`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use site_mirror::output::output_folder_name;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 59).unwrap();
/// assert_eq!(output_folder_name("https://www.site.test/a", at), "www-site-test_2024-03-09_14-05");
/// ```
pub fn output_folder_name(start_url: &str, at: DateTime<Utc>) -> String {
    let prefix = Url::parse(start_url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.replace('.', "-")))
        .unwrap_or_else(|| "scraped".to_string());

    format!("{}_{}", prefix, at.format("%Y-%m-%d_%H-%M"))
}

/// Maps a page URL to its folder inside the run folder
///
/// One leading and one trailing slash are removed from the path, the root
/// becomes `home`, and every character outside `[A-Za-z0-9-_/]` becomes
/// `-`. Unparsable URLs map to `unknown`.
///
/// # Examples
///
/// ```
/// use site_mirror::output::url_to_folder_name;
///
/// assert_eq!(url_to_folder_name("https://site.test/"), "home");
/// assert_eq!(url_to_folder_name("https://site.test/docs/intro.html"), "docs/intro-html");
/// ```
pub fn url_to_folder_name(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "unknown".to_string();
    };

    let path = parsed.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);

    if path.is_empty() {
        return "home".to_string();
    }

    path.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Maps an asset URL to its file name
///
/// The sanitized last path segment (or `asset`) gets the first 8 hex digits
/// of the URL's SHA-256 before its extension, so `/a/logo.png` and
/// `/b/logo.png` land in different files.
pub fn asset_file_name(url: &str) -> String {
    let last = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .unwrap_or_default();

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = if cleaned.trim_matches('.').is_empty() {
        "asset"
    } else {
        cleaned.as_str()
    };

    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    let tag = &digest[..8];
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}-{}.{}", stem, tag, ext)
        }
        _ => format!("{}-{}", name, tag),
    }
}

/// Writes the mirror to the local filesystem
pub struct FsOutput {
    root: PathBuf,
    run_dir: Mutex<Option<PathBuf>>,
}

impl FsOutput {
    /// Creates a sink writing run folders below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            run_dir: Mutex::new(None),
        }
    }

    /// Returns the current run folder
    pub fn run_dir(&self) -> Option<PathBuf> {
        self.run_dir.lock().ok().and_then(|dir| dir.clone())
    }

    fn require_run_dir(&self) -> OutputResult<PathBuf> {
        self.run_dir().ok_or(OutputError::NotStarted)
    }

    fn page_dir(&self, url: &str) -> OutputResult<PathBuf> {
        let dir = self.require_run_dir()?.join(url_to_folder_name(url));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> OutputResult<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl OutputSink for FsOutput {
    fn begin_run(&self, start_url: &str) -> OutputResult<String> {
        let dir = self.root.join(output_folder_name(start_url, Utc::now()));
        fs::create_dir_all(&dir)?;
        tracing::info!("Writing mirror to {}", dir.display());

        let display = dir.display().to_string();
        if let Ok(mut current) = self.run_dir.lock() {
            *current = Some(dir);
        }
        Ok(display)
    }

    fn location(&self) -> Option<String> {
        self.run_dir().map(|dir| dir.display().to_string())
    }

    fn write_sitemap(&self, sitemap: &SitemapSnapshot) -> OutputResult<()> {
        let path = self.require_run_dir()?.join("sitemap.json");
        Self::write_json(&path, sitemap)
    }

    fn write_page_html(&self, url: &str, html: &str) -> OutputResult<()> {
        let path = self.page_dir(url)?.join("index.html");
        fs::write(path, html)?;
        Ok(())
    }

    fn write_page_metadata(&self, url: &str, metadata: &PageMetadata) -> OutputResult<()> {
        let path = self.page_dir(url)?.join("page-metadata.json");
        Self::write_json(&path, metadata)
    }

    fn write_screenshot(
        &self,
        url: &str,
        image: &[u8],
        variant: ScreenshotVariant,
    ) -> OutputResult<()> {
        let path = self.page_dir(url)?.join(variant.file_name());
        fs::write(path, image)?;
        Ok(())
    }

    fn write_asset(&self, url: &str, bytes: &[u8], kind: AssetKind) -> OutputResult<()> {
        let dir = self.require_run_dir()?.join("assets").join(kind.subfolder());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(asset_file_name(url)), bytes)?;
        Ok(())
    }

    fn write_run_summary(&self, summary: &RunSummary) -> OutputResult<()> {
        let dir = self.require_run_dir()?;
        Self::write_json(&dir.join("metadata.json"), summary)?;
        fs::write(dir.join("summary.md"), format_markdown_summary(summary))?;
        Ok(())
    }
}
