//! HTML parser for extracting links, assets and metadata
//!
//! This module turns a fetched HTML document into an [`ExtractedPage`]:
//! - Links to follow (from `<a>` tags)
//! - Asset URLs grouped by kind (images, stylesheets, scripts, fonts)
//! - Descriptive metadata (title, meta tags, headings, counts, navigation)

use crate::crawler::traits::{
    DiscoveredLink, ExtractedPage, NavigationGroup, PageAssets, PageMetadata,
};
use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static CSS_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'"()]+?)['"]?\s*\)"#).expect("CSS url() regex is valid") // Static pattern, safe to panic
});

static FONT_FACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)@font-face\s*\{([^}]*)\}").expect("@font-face regex is valid") // Static pattern, safe to panic
});

/// Selectors whose elements are reported as navigation groups
const NAVIGATION_SELECTORS: &[&str] = &[
    "nav",
    "[role=\"navigation\"]",
    "header nav",
    ".nav",
    ".navigation",
    ".menu",
    "#nav",
    "#navigation",
    "#menu",
];

/// Elements whose text is not counted as page words
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Parses an HTML document and extracts everything the crawl needs
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags resolving to http(s) URLs
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` links
/// - Fragment-only links
/// - Duplicates of a URL already seen on the same page
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The final URL of the page, used to resolve relative references
///
/// # Example
///
/// ```
/// use site_mirror::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let page = extract_page(html, &page_url);
/// assert_eq!(page.metadata.title, "Test");
/// assert_eq!(page.links[0].url, "https://example.com/page");
/// ```
pub fn extract_page(html: &str, page_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        final_url: page_url.to_string(),
        html: html.to_string(),
        links: extract_links(&document, page_url),
        assets: extract_assets(&document, page_url),
        metadata: extract_metadata(&document, page_url),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn link_from_anchor(anchor: ElementRef<'_>, page_url: &Url) -> Option<DiscoveredLink> {
    let url = resolve_link(anchor.value().attr("href")?, page_url)?;
    Some(DiscoveredLink {
        url,
        text: element_text(anchor),
        title: anchor.value().attr("title").unwrap_or_default().to_string(),
    })
}

/// Extracts unique links from `<a href>` tags, in document order
fn extract_links(document: &Html, page_url: &Url) -> Vec<DiscoveredLink> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&a_selector)
        .filter(|anchor| anchor.value().attr("download").is_none())
        .filter_map(|anchor| link_from_anchor(anchor, page_url))
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data:, blob: schemes
/// - Fragment-only references
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:", "blob:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    match page_url.join(href) {
        Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => Some(absolute.to_string()),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!("Skipping unresolvable reference {}: {}", href, e);
            None
        }
    }
}

/// Appends a resolved URL to `out` unless it is already present
fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, raw: &str, page_url: &Url) {
    if let Some(url) = resolve_link(raw, page_url) {
        if seen.insert(url.clone()) {
            out.push(url);
        }
    }
}

fn css_urls(css: &str) -> impl Iterator<Item = &str> {
    CSS_URL_PATTERN
        .captures_iter(css)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

fn extract_assets(document: &Html, page_url: &Url) -> PageAssets {
    let mut assets = PageAssets::default();
    let mut seen_images = HashSet::new();
    let mut seen_styles = HashSet::new();
    let mut seen_scripts = HashSet::new();
    let mut seen_fonts = HashSet::new();

    // Images: src and every srcset candidate
    if let Some(img_selector) = selector("img") {
        for img in document.select(&img_selector) {
            if let Some(src) = img.value().attr("src") {
                push_unique(&mut assets.images, &mut seen_images, src, page_url);
            }
            if let Some(srcset) = img.value().attr("srcset") {
                for candidate in srcset.split(',') {
                    if let Some(url) = candidate.split_whitespace().next() {
                        push_unique(&mut assets.images, &mut seen_images, url, page_url);
                    }
                }
            }
        }
    }

    // Background images from inline styles
    if let Some(styled) = selector("[style]") {
        for element in document.select(&styled) {
            let style = element.value().attr("style").unwrap_or_default();
            if !style.to_ascii_lowercase().contains("background") {
                continue;
            }
            for url in css_urls(style) {
                push_unique(&mut assets.images, &mut seen_images, url, page_url);
            }
        }
    }

    // SVG <image href> / <image xlink:href>
    if let Some(svg_images) = selector("svg image") {
        for image in document.select(&svg_images) {
            if let Some(href) = image.value().attr("href") {
                push_unique(&mut assets.images, &mut seen_images, href, page_url);
            }
        }
    }

    if let Some(link_selector) = selector("link[rel][href]") {
        for link in document.select(&link_selector) {
            let is_stylesheet = link
                .value()
                .attr("rel")
                .map(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
                .unwrap_or(false);
            if let (true, Some(href)) = (is_stylesheet, link.value().attr("href")) {
                push_unique(&mut assets.stylesheets, &mut seen_styles, href, page_url);
            }
        }
    }

    // Inline <style>: @font-face sources are fonts, other url() references
    // are collected with the stylesheets
    if let Some(style_selector) = selector("style") {
        for style in document.select(&style_selector) {
            let css: String = style.text().collect();

            let mut font_refs = HashSet::new();
            for block in FONT_FACE_PATTERN.captures_iter(&css) {
                if let Some(body) = block.get(1) {
                    for url in css_urls(body.as_str()) {
                        font_refs.insert(url.to_string());
                        push_unique(&mut assets.fonts, &mut seen_fonts, url, page_url);
                    }
                }
            }

            for url in css_urls(&css).filter(|url| !font_refs.contains(*url)) {
                push_unique(&mut assets.stylesheets, &mut seen_styles, url, page_url);
            }
        }
    }

    if let Some(script_selector) = selector("script[src]") {
        for script in document.select(&script_selector) {
            if let Some(src) = script.value().attr("src") {
                push_unique(&mut assets.scripts, &mut seen_scripts, src, page_url);
            }
        }
    }

    assets
}

fn meta_content(document: &Html, attribute: &str, name: &str) -> String {
    selector(&format!("meta[{}=\"{}\"]", attribute, name))
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|meta| meta.value().attr("content"))
                .map(|content| content.trim().to_string())
        })
        .unwrap_or_default()
}

fn count_words(document: &Html) -> usize {
    let root = selector("body")
        .and_then(|s| document.select(&s).next())
        .unwrap_or_else(|| document.root_element());

    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent_name = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name().to_string()));
            match parent_name {
                Some(name) if NON_CONTENT_ELEMENTS.contains(&name.as_str()) => None,
                _ => Some(text.split_whitespace().count()),
            }
        })
        .sum()
}

fn extract_navigation(document: &Html, page_url: &Url) -> Vec<NavigationGroup> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    for css in NAVIGATION_SELECTORS {
        let Some(nav_selector) = selector(css) else {
            continue;
        };
        for nav in document.select(&nav_selector) {
            let links: Vec<DiscoveredLink> = nav
                .select(&a_selector)
                .filter_map(|anchor| link_from_anchor(anchor, page_url))
                .collect();
            if !links.is_empty() {
                groups.push(NavigationGroup {
                    selector: css.to_string(),
                    links,
                });
            }
        }
    }
    groups
}

fn extract_metadata(document: &Html, page_url: &Url) -> PageMetadata {
    let title = selector("title")
        .and_then(|s| document.select(&s).next())
        .map(element_text)
        .unwrap_or_default();

    let h1_tags: Vec<String> = selector("h1")
        .map(|s| {
            document
                .select(&s)
                .map(element_text)
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let image_count = selector("img")
        .map(|s| document.select(&s).count())
        .unwrap_or(0);

    PageMetadata {
        title,
        meta_description: meta_content(document, "name", "description"),
        meta_keywords: meta_content(document, "name", "keywords"),
        og_title: meta_content(document, "property", "og:title"),
        og_description: meta_content(document, "property", "og:description"),
        og_image: meta_content(document, "property", "og:image"),
        h1_tags,
        word_count: count_words(document),
        image_count,
        navigation: extract_navigation(document, page_url),
        url: page_url.to_string(),
        timestamp: Utc::now(),
    }
}
