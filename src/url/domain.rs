use url::Url;

/// Returns the network location of a URL: host plus an explicit port
///
/// Default ports are not part of the netloc because the URL parser drops
/// them, so `https://example.com:443/` and `https://example.com/` agree.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use web_crawler::url::netloc;
///
/// let url = Url::parse("http://127.0.0.1:8080/path").unwrap();
/// assert_eq!(netloc(&url), "127.0.0.1:8080");
///
/// let url = Url::parse("https://example.com/path").unwrap();
/// assert_eq!(netloc(&url), "example.com");
/// ```
pub fn netloc(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Checks whether a URL belongs to the crawl domain
///
/// The match is substring containment of `domain` in the URL's netloc.
/// Subdomains match, and so does any unrelated host that happens to contain
/// the domain string (`example.com.evil.net`).
pub fn is_same_domain(url: &Url, domain: &str) -> bool {
    netloc(url).contains(domain)
}
