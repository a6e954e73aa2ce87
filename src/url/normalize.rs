use crate::UrlError;
use url::Url;

/// Normalizes a URL for deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Remove the query string
/// 4. Remove the fragment
/// 5. Strip trailing slashes from the path; an empty path becomes `/`
///
/// Scheme, host, port and the rest of the path are kept as parsed. The
/// function is idempotent: normalizing a normalized URL returns it unchanged.
///
/// # Examples
///
/// ```
/// use web_crawler::url::normalize_url;
///
/// let url = normalize_url("https://example.com/docs/?page=2#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs");
///
/// let root = normalize_url("https://example.com").unwrap();
/// assert_eq!(root.as_str(), "https://example.com/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_query(None);
    url.set_fragment(None);

    let path = strip_trailing_slashes(url.path());
    url.set_path(&path);

    Ok(url)
}

/// Removes trailing slashes, keeping the root path as `/`
fn strip_trailing_slashes(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
