use crate::config::types::{Config, CrawlConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Largest accepted value for `max-concurrent-downloads`
const MAX_CONCURRENT_DOWNLOADS: usize = 32;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the settings of a single crawl run
///
/// This runs before any run state is created, so an invalid start URL is
/// reported without touching the frontier or the output directory.
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.url)?;

    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_downloads must be between 1 and {}, got {}",
            MAX_CONCURRENT_DOWNLOADS, config.max_concurrent_downloads
        )));
    }

    if config.page_load_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "page_load_timeout_secs must be >= 1".to_string(),
        ));
    }

    for pattern in &config.exclude_patterns {
        validate_exclude_pattern(pattern)?;
    }

    Ok(())
}

/// The start URL must be absolute, http(s) and carry a host
fn validate_start_url(raw: &str) -> Result<(), ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::InvalidUrl("url is required".to_string()));
    }

    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start url '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Start url '{}' must use http or https",
            raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Start url '{}' has no host",
            raw
        )));
    }

    Ok(())
}

fn validate_exclude_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Exclude pattern cannot be empty".to_string(),
        ));
    }

    // Wildcards alone would exclude every discovered link
    if pattern.chars().all(|c| c == '*') {
        return Err(ConfigError::InvalidPattern(format!(
            "Exclude pattern '{}' matches every URL",
            pattern
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.state_path.is_empty() {
        return Err(ConfigError::Validation(
            "state_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_crawl_config() {
        let config = CrawlConfig::new("https://example.com/");
        assert!(validate_crawl_config(&config).is_ok());
    }

    #[test]
    fn test_missing_url() {
        let config = CrawlConfig::new("");
        assert!(matches!(
            validate_crawl_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_relative_url_rejected() {
        let config = CrawlConfig::new("/just/a/path");
        assert!(matches!(
            validate_crawl_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let config = CrawlConfig::new("ftp://example.com/");
        assert!(validate_crawl_config(&config).is_err());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = CrawlConfig::new("https://example.com/");
        config.max_concurrent_downloads = 0;
        assert!(validate_crawl_config(&config).is_err());

        config.max_concurrent_downloads = 33;
        assert!(validate_crawl_config(&config).is_err());

        config.max_concurrent_downloads = 1;
        assert!(validate_crawl_config(&config).is_ok());
    }

    #[test]
    fn test_exclude_patterns() {
        assert!(validate_exclude_pattern("*/admin*").is_ok());
        assert!(validate_exclude_pattern("").is_err());
        assert!(validate_exclude_pattern("**").is_err());
    }

    #[test]
    fn test_user_agent_name() {
        let mut ua = UserAgentConfig::default();
        assert!(validate_user_agent_config(&ua).is_ok());

        ua.crawler_name = "bad name".to_string();
        assert!(validate_user_agent_config(&ua).is_err());
    }
}
