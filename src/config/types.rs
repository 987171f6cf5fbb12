use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Main configuration structure for Site-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Builds a configuration for `url` with every other setting at its default
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            crawl: CrawlConfig::new(url),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Settings for a single crawl run
///
/// This is the value handed to [`crate::crawler::Coordinator::start`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Start URL; must be an absolute http(s) URL
    pub url: String,

    /// Maximum link depth from the start page
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Pause between two pages (milliseconds)
    #[serde(default = "default_crawl_delay_ms")]
    pub crawl_delay_ms: u64,

    #[serde(default = "default_true")]
    pub screenshot_desktop: bool,

    #[serde(default = "default_true")]
    pub screenshot_mobile: bool,

    /// Glob-like patterns (`*` wildcard) for URLs that must never be crawled
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Upper bound on simultaneous asset downloads
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// How long a page may take to load before it counts as failed (seconds)
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,
}

impl CrawlConfig {
    /// Creates a crawl configuration for `url` using the default limits
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: default_max_depth(),
            crawl_delay_ms: default_crawl_delay_ms(),
            screenshot_desktop: true,
            screenshot_mobile: true,
            exclude_patterns: Vec::new(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            page_load_timeout_secs: default_page_load_timeout_secs(),
        }
    }

    /// Returns true if any screenshot variant is requested
    pub fn wants_screenshots(&self) -> bool {
        self.screenshot_desktop || self.screenshot_mobile
    }

    /// Hex-encoded SHA-256 of the serialized settings
    ///
    /// Stored with each run so that runs with identical settings can be
    /// recognised in the run history.
    pub fn fingerprint(&self) -> String {
        let serialized = toml::to_string(self).unwrap_or_else(|_| format!("{:?}", self));
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// Optional URL with information about the crawler
    #[serde(default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteMirror".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory under which each run creates its own mirror folder
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// Path to the SQLite database holding the last known run state
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            state_path: default_state_path(),
        }
    }
}

fn default_max_depth() -> u32 {
    5
}

fn default_crawl_delay_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_downloads() -> usize {
    3
}

fn default_page_load_timeout_secs() -> u64 {
    30
}

fn default_output_directory() -> String {
    "./mirror".to_string()
}

fn default_state_path() -> String {
    "./mirror/state.db".to_string()
}
