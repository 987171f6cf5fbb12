//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent
//! - GET requests that load and extract a page
//! - Asset downloads handed to the output sink
//! - Error classification into page-level failures

use crate::config::UserAgentConfig;
use crate::crawler::parser::extract_page;
use crate::crawler::scheduler::AssetRecord;
use crate::crawler::traits::{AssetFetcher, ExtractedPage, PageLoader};
use crate::output::OutputSink;
use crate::MirrorError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Content types accepted as pages
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed (reqwest's default policy of up to 10 hops), so
/// the final URL of a response may differ from the requested one.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total time allowed for one request, body included
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::UserAgentConfig;
/// use site_mirror::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SiteMirror".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: None,
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if a Content-Type header value denotes an HTML document
///
/// A missing header is accepted; many small servers omit it.
fn is_html_content_type(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&mime.as_str())
}

fn classify_load_error(url: &str, error: reqwest::Error) -> MirrorError {
    if error.is_timeout() {
        MirrorError::LoadTimeout {
            url: url.to_string(),
        }
    } else {
        MirrorError::Extraction {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Page loader backed by plain HTTP requests and static HTML extraction
pub struct HttpPageLoader {
    client: Client,
}

impl HttpPageLoader {
    /// Creates a loader with its own client
    pub fn new(user_agent: &UserAgentConfig, timeout_secs: u64) -> crate::Result<Self> {
        let client = build_http_client(user_agent, Duration::from_secs(timeout_secs))?;
        Ok(Self { client })
    }

    /// Creates a loader sharing an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn fetch_and_extract(&self, url: &str) -> crate::Result<ExtractedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_load_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Extraction {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !is_html_content_type(content_type.as_deref()) {
            return Err(MirrorError::Extraction {
                url: url.to_string(),
                message: format!(
                    "Not an HTML document ({})",
                    content_type.unwrap_or_default()
                ),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_load_error(url, e))?;

        tracing::debug!("Loaded {} ({} bytes)", final_url, body.len());

        Ok(extract_page(&body, &final_url))
    }
}

/// Asset fetcher that downloads with reqwest and stores through an output sink
pub struct HttpAssetFetcher {
    client: Client,
    output: Arc<dyn OutputSink>,
}

impl HttpAssetFetcher {
    pub fn new(client: Client, output: Arc<dyn OutputSink>) -> Self {
        Self { client, output }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, record: &AssetRecord) -> crate::Result<()> {
        let response = self
            .client
            .get(&record.url)
            .send()
            .await
            .map_err(|source| MirrorError::Http {
                url: record.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::DownloadFailure {
                url: record.url.clone(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let bytes = response.bytes().await.map_err(|source| MirrorError::Http {
            url: record.url.clone(),
            source,
        })?;

        self.output.write_asset(&record.url, &bytes, record.kind)?;
        tracing::trace!("Saved asset {} ({} bytes)", record.url, bytes.len());
        Ok(())
    }
}
