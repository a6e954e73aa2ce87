//! Page records and the per-fetch record construction policy
//!
//! Every dispatched URL yields exactly one [`PageRecord`], whatever happened
//! to its fetch. Failures are encoded in the status code and sentinel text.

use crate::crawler::fetcher::{is_html_content_type, FetchResult, TransportErrorKind};
use crate::crawler::parser::{extract_metadata, PageMetadata, ParsedPage};
use serde::{Deserialize, Serialize};
use url::Url;

/// Status for a URL that was never fetched or whose retries ran out
pub const STATUS_NOT_FETCHED: i32 = 0;

/// Status for a URL whose last attempt could not connect
pub const STATUS_CONNECTION_FAILED: i32 = -1;

pub const FETCH_FAILED: &str = "Fetch failed";
pub const CONNECTION_ERROR: &str = "Connection error";
pub const PROCESSING_ERROR: &str = "Processing error";

/// One row of the result set
///
/// Field order is the column order of every CSV artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub status_code: i32,
    pub title: String,
    pub h1: String,
    pub meta_description: String,
    pub referrer: String,
    pub canonical_url: String,
    pub depth: u32,
}

impl PageRecord {
    /// Record whose three text fields all carry the same sentinel
    pub fn sentinel(url: &str, status_code: i32, text: &str, referrer: &str, depth: u32) -> Self {
        Self {
            url: url.to_string(),
            status_code,
            title: text.to_string(),
            h1: text.to_string(),
            meta_description: text.to_string(),
            referrer: referrer.to_string(),
            canonical_url: url.to_string(),
            depth,
        }
    }

    /// Copy with line breaks in text fields replaced by literal `\n` / `\r`
    pub fn escaped(&self) -> Self {
        Self {
            title: escape_line_breaks(&self.title),
            h1: escape_line_breaks(&self.h1),
            meta_description: escape_line_breaks(&self.meta_description),
            ..self.clone()
        }
    }

    /// Whether the status is an actual 2xx HTTP response
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

fn escape_line_breaks(text: &str) -> String {
    text.replace('\n', "\\n").replace('\r', "\\r")
}

/// Identity of the page a record is being built for
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub url: Url,
    pub referrer: String,
    pub depth: u32,
}

impl RecordContext {
    pub fn new(url: Url, referrer: impl Into<String>, depth: u32) -> Self {
        Self {
            url,
            referrer: referrer.into(),
            depth,
        }
    }

    fn sentinel(&self, status_code: i32, text: &str) -> PageRecord {
        PageRecord::sentinel(self.url.as_str(), status_code, text, &self.referrer, self.depth)
    }

    /// Record for a page whose extraction could not run
    pub fn processing_error(&self, status: Option<u16>) -> PageRecord {
        let status_code = status.map_or(STATUS_NOT_FETCHED, i32::from);
        self.sentinel(status_code, PROCESSING_ERROR)
    }

    /// Record for a page with extracted metadata
    pub fn with_metadata(&self, status: u16, metadata: PageMetadata) -> PageRecord {
        PageRecord {
            url: self.url.to_string(),
            status_code: i32::from(status),
            title: metadata.title,
            h1: metadata.h1,
            meta_description: metadata.meta_description,
            referrer: self.referrer.clone(),
            canonical_url: metadata.canonical_url,
            depth: self.depth,
        }
    }
}

/// Builds the record for one fetch outcome
///
/// | Outcome | status_code | text fields |
/// |---------|-------------|-------------|
/// | robots.txt block | 0 | "Fetch failed" |
/// | connection failure | -1 | "Connection error" |
/// | other transport failure | 0 | "Fetch failed" |
/// | non-2xx response | actual | "HTTP error {code}" |
/// | non-HTML response | actual | "Non-HTML content" with the content type |
/// | HTML response | actual | extracted metadata |
///
/// Metadata is only extracted for 2xx HTML responses. `parsed` lets a caller
/// that already parsed the body reuse that document.
pub fn build_record(
    context: &RecordContext,
    fetch: &FetchResult,
    parsed: Option<&ParsedPage>,
) -> PageRecord {
    match fetch {
        FetchResult::PolicyBlocked => context.sentinel(STATUS_NOT_FETCHED, FETCH_FAILED),

        FetchResult::TransportFailure {
            kind: TransportErrorKind::Connect,
            ..
        } => context.sentinel(STATUS_CONNECTION_FAILED, CONNECTION_ERROR),

        FetchResult::TransportFailure { .. } => context.sentinel(STATUS_NOT_FETCHED, FETCH_FAILED),

        FetchResult::Success { status, body, .. } => {
            if !(200..300).contains(status) {
                let text = format!("HTTP error {}", status);
                return context.sentinel(i32::from(*status), &text);
            }

            let content_type = fetch.content_type().unwrap_or_default().to_ascii_lowercase();
            if !is_html_content_type(&content_type) {
                return PageRecord {
                    title: format!("Non-HTML content ({})", content_type),
                    h1: format!("Non-HTML content ({})", content_type),
                    meta_description: format!("Content type: {}", content_type),
                    ..context.sentinel(i32::from(*status), "")
                };
            }

            let metadata = match parsed {
                Some(page) => page.metadata(&context.url),
                None => extract_metadata(body, &context.url),
            };
            context.with_metadata(*status, metadata)
        }
    }
}
