use url::Url;

/// Extracts the host from a URL, lowercased
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `raw` points at the same host as `base`
///
/// Only the host name is compared; scheme and port may differ. A URL that
/// does not parse, or has no host, is never internal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::is_internal;
///
/// let base = Url::parse("https://site.test/").unwrap();
/// assert!(is_internal("http://site.test:8080/about", &base));
/// assert!(!is_internal("https://cdn.site.test/a.js", &base));
/// assert!(!is_internal("::not a url::", &base));
/// ```
pub fn is_internal(raw: &str, base: &Url) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };

    match (extract_domain(&url), extract_domain(base)) {
        (Some(host), Some(base_host)) => host == base_host,
        _ => false,
    }
}

/// Returns the ASCII origin of a URL (`scheme://host[:port]`)
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://site.test/").unwrap()
    }

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_internal_same_host() {
        assert!(is_internal("https://site.test/a/b", &base()));
    }

    #[test]
    fn test_internal_ignores_scheme_and_port() {
        assert!(is_internal("http://site.test/a", &base()));
        assert!(is_internal("https://site.test:8443/a", &base()));
    }

    #[test]
    fn test_internal_host_case_insensitive() {
        assert!(is_internal("https://SITE.test/a", &base()));
    }

    #[test]
    fn test_subdomain_is_external() {
        assert!(!is_internal("https://www.site.test/", &base()));
    }

    #[test]
    fn test_other_host_is_external() {
        assert!(!is_internal("https://other.test/", &base()));
    }

    #[test]
    fn test_malformed_is_external() {
        assert!(!is_internal("not a url", &base()));
        assert!(!is_internal("", &base()));
    }

    #[test]
    fn test_hostless_is_external() {
        assert!(!is_internal("mailto:someone@site.test", &base()));
    }

    #[test]
    fn test_origin_of() {
        let url = Url::parse("https://site.test:8443/path?q=1").unwrap();
        assert_eq!(origin_of(&url), "https://site.test:8443");
    }
}
