use url::Url;

/// URL schemes whose assets cannot be fetched and are silently dropped
const UNFETCHABLE_ASSET_SCHEMES: &[&str] = &["data:", "blob:", "javascript:"];

/// Normalizes a page URL for visited-set membership
///
/// # Normalization Steps
///
/// 1. Parse the URL; unparsable input is returned unchanged
/// 2. Remove the fragment (everything after #)
/// 3. Remove a single trailing slash from the path (the root `/` is kept)
///
/// Query strings are preserved, so `/list?page=2` and `/list?page=3` stay
/// distinct pages.
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_url;
///
/// assert_eq!(normalize_url("https://example.com/docs/#intro"), "https://example.com/docs");
/// assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
/// assert_eq!(normalize_url("not a url"), "not a url");
/// ```
pub fn normalize_url(raw: &str) -> String {
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => return raw.to_string(),
    };

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(&path[..path.len() - 1]);
    }

    url.to_string()
}

/// Computes the deduplication key of an asset URL
///
/// The key is the origin followed by the path; query string and fragment
/// are dropped so cache-busting variants collapse to one download.
///
/// Returns `None` for `data:`, `blob:` and `javascript:` URLs and for
/// anything that does not parse.
///
/// # Examples
///
/// ```
/// use site_mirror::url::asset_dedup_key;
///
/// assert_eq!(
///     asset_dedup_key("https://cdn.test/a.png?v=1").as_deref(),
///     Some("https://cdn.test/a.png")
/// );
/// assert_eq!(asset_dedup_key("data:image/png;base64,AAAA"), None);
/// ```
pub fn asset_dedup_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if UNFETCHABLE_ASSET_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let url = Url::parse(trimmed).ok()?;
    url.host_str()?;

    Some(format!("{}{}", url.origin().ascii_serialization(), url.path()))
}
