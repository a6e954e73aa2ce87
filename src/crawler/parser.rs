//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Same-domain links to follow (from `<a href>` tags)
//! - Page title, first h1, meta description and canonical URL
//!
//! Both extractions can share one parsed document through [`ParsedPage`].

use crate::url::{is_same_domain, normalize_url};
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const NO_TITLE: &str = "No title";
pub const NO_H1: &str = "No h1";
pub const NO_DESCRIPTION: &str = "No description";
pub const EXTRACTION_ERROR: &str = "Extraction error";

/// Href prefixes that never lead to a crawlable page
const IGNORED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "file:", "data:", "ftp:"];

/// Path suffixes of binary and media resources
const IGNORED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".bmp", ".tif", ".tiff", ".avif",
    ".pdf", ".zip", ".gz", ".tgz", ".tar", ".rar", ".7z", ".exe", ".dmg", ".msi", ".mp3",
    ".mp4", ".wav", ".avi", ".mov", ".wmv", ".webm", ".woff", ".woff2", ".ttf", ".otf", ".eot",
];

/// Infrastructure paths injected by CDNs (challenge pages, email obfuscation)
const IGNORED_PATHS: &[&str] = &["/cdn-cgi/"];

/// Metadata extracted from one HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub h1: String,
    pub meta_description: String,
    pub canonical_url: String,
}

impl PageMetadata {
    /// All-sentinel result for a document that could not be processed
    pub fn extraction_error(url: &Url) -> Self {
        Self {
            title: EXTRACTION_ERROR.to_string(),
            h1: EXTRACTION_ERROR.to_string(),
            meta_description: EXTRACTION_ERROR.to_string(),
            canonical_url: url.to_string(),
        }
    }
}

/// Compiled selectors used by both extractions
struct Selectors {
    anchor: Selector,
    title: Selector,
    h1: Selector,
    meta_description: Selector,
    canonical: Selector,
}

impl Selectors {
    fn new() -> Result<Self, String> {
        let parse = |css: &str| Selector::parse(css).map_err(|e| format!("{}: {:?}", css, e));
        Ok(Self {
            anchor: parse("a[href]")?,
            title: parse("title")?,
            h1: parse("h1")?,
            meta_description: parse(r#"meta[name="description"]"#)?,
            canonical: parse(r#"link[rel~="canonical"]"#)?,
        })
    }
}

/// A parsed HTML document
///
/// `Html` is not `Send`; build and drop a `ParsedPage` without awaiting in
/// between.
pub struct ParsedPage {
    document: Html,
    selectors: Result<Selectors, String>,
}

impl ParsedPage {
    /// Parses an HTML document
    ///
    /// # Example
    ///
    /// ```
    /// use url::Url;
    /// use web_crawler::crawler::ParsedPage;
    ///
    /// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
    /// let base_url = Url::parse("https://example.com/").unwrap();
    /// let page = ParsedPage::parse(html);
    /// assert_eq!(page.metadata(&base_url).title, "Test");
    /// assert_eq!(page.links(&base_url, "example.com"), vec!["https://example.com/page"]);
    /// ```
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            selectors: Selectors::new(),
        }
    }

    /// Extracts normalized same-domain links in document order
    ///
    /// # Link Extraction Rules
    ///
    /// **Exclude:**
    /// - empty and fragment-only hrefs
    /// - `mailto:`, `tel:`, `javascript:`, `file:`, `data:`, `ftp:` hrefs
    /// - hrefs that fail to resolve against `base_url` (logged)
    /// - non-HTTP(S) URLs after resolution
    /// - image, media, font, archive and document extensions
    /// - CDN infrastructure paths (`/cdn-cgi/`)
    /// - links whose netloc does not contain `domain`
    ///
    /// Duplicates are kept; deduplication happens at admission.
    pub fn links(&self, base_url: &Url, domain: &str) -> Vec<String> {
        let selectors = match &self.selectors {
            Ok(selectors) => selectors,
            Err(e) => {
                tracing::error!("Cannot extract links from {}: {}", base_url, e);
                return Vec::new();
            }
        };

        self.document
            .select(&selectors.anchor)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, base_url))
            .filter(|url| is_same_domain(url, domain))
            .map(|url| url.to_string())
            .collect()
    }

    /// Extracts title, first h1, meta description and canonical URL
    pub fn metadata(&self, url: &Url) -> PageMetadata {
        let selectors = match &self.selectors {
            Ok(selectors) => selectors,
            Err(e) => {
                tracing::error!("Cannot extract metadata from {}: {}", url, e);
                return PageMetadata::extraction_error(url);
            }
        };

        PageMetadata {
            title: first_text(&self.document, &selectors.title)
                .unwrap_or_else(|| NO_TITLE.to_string()),
            h1: first_text(&self.document, &selectors.h1).unwrap_or_else(|| NO_H1.to_string()),
            meta_description: self
                .meta_description(&selectors.meta_description, url)
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            canonical_url: self
                .canonical_url(&selectors.canonical, url)
                .unwrap_or_else(|| url.to_string()),
        }
    }

    fn meta_description(&self, selector: &Selector, url: &Url) -> Option<String> {
        for element in self.document.select(selector) {
            match element.value().attr("content") {
                Some(content) if !content.trim().is_empty() => {
                    return Some(content.trim().to_string())
                }
                Some(_) => {}
                None => tracing::warn!("Skipping description meta tag without content on {}", url),
            }
        }
        None
    }

    fn canonical_url(&self, selector: &Selector, url: &Url) -> Option<String> {
        for element in self.document.select(selector) {
            let Some(href) = element.value().attr("href").map(str::trim) else {
                tracing::warn!("Skipping canonical link without href on {}", url);
                continue;
            };
            if href.is_empty() {
                continue;
            }
            match url.join(href) {
                Ok(canonical) => return Some(canonical.to_string()),
                Err(e) => tracing::warn!("Skipping malformed canonical href {:?} on {}: {}", href, url, e),
            }
        }
        None
    }
}

/// Trimmed text of the first element matching `selector`, if non-empty
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element: ElementRef| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Resolves an href against the page URL and applies the link filters
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if IGNORED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        tracing::trace!("Skipping {} link on {}", href, base_url);
        return None;
    }

    let absolute = match base_url.join(href) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Skipping malformed href {:?} on {}: {}", href, base_url, e);
            return None;
        }
    };

    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    let path = absolute.path().to_ascii_lowercase();
    if IGNORED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return None;
    }
    if IGNORED_PATHS.iter().any(|infra| path.contains(infra)) {
        return None;
    }

    match normalize_url(absolute.as_str()) {
        Ok(normalized) => Some(normalized),
        Err(e) => {
            tracing::warn!("Skipping unnormalizable link {} on {}: {}", absolute, base_url, e);
            None
        }
    }
}

/// Extracts normalized same-domain links from an HTML document
pub fn extract_links(html: &str, base_url: &Url, domain: &str) -> Vec<String> {
    ParsedPage::parse(html).links(base_url, domain)
}

/// Extracts page metadata from an HTML document
pub fn extract_metadata(html: &str, url: &Url) -> PageMetadata {
    ParsedPage::parse(html).metadata(url)
}
