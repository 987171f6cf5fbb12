use url::Url;

/// Checks if `text` contains a match for a glob-like pattern
///
/// `*` matches any (possibly empty) substring; every other character is
/// literal, including `.`. The match is unanchored: the pattern may match
/// anywhere inside `text`.
///
/// # Examples
///
/// ```
/// use site_mirror::url::matches_wildcard;
///
/// assert!(matches_wildcard("*/admin*", "https://site.test/admin/x"));
/// assert!(matches_wildcard("admin", "/site/admin/users"));
/// assert!(matches_wildcard(".pdf", "/files/report.pdf"));
/// assert!(!matches_wildcard(".pdf", "/files/reportxpdf"));
/// ```
pub fn matches_wildcard(pattern: &str, text: &str) -> bool {
    let mut position = 0;

    for literal in pattern.split('*').filter(|part| !part.is_empty()) {
        match text[position..].find(literal) {
            Some(offset) => position += offset + literal.len(),
            None => return false,
        }
    }

    true
}

/// Returns true if a URL matches any exclusion pattern
///
/// Each pattern is tested against the URL path and against the full URL
/// as given. A URL that cannot be parsed is excluded.
///
/// # Examples
///
/// ```
/// use site_mirror::url::is_excluded;
///
/// let patterns = vec!["*/admin*".to_string()];
/// assert!(is_excluded("https://site.test/admin/x", &patterns));
/// assert!(!is_excluded("https://site.test/blog", &patterns));
/// assert!(is_excluded("::garbage::", &[]));
/// ```
pub fn is_excluded(raw: &str, patterns: &[String]) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return true;
    };

    let path = url.path();
    patterns
        .iter()
        .any(|pattern| matches_wildcard(pattern, path) || matches_wildcard(pattern, raw))
}
