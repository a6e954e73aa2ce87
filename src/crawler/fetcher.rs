//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - robots.txt enforcement before any request is issued
//! - Bounded retry with a fixed delay for transient failures
//! - Error classification

use crate::config::CrawlerConfig;
use crate::robots::RobotsCache;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// A completed HTTP exchange; the status may be any code
    Success {
        /// HTTP status code
        status: u16,
        /// Decoded response body
        body: String,
        /// Response headers
        headers: HeaderMap,
    },

    /// robots.txt disallows the URL; no request was sent
    PolicyBlocked,

    /// The request failed at the transport level on its last attempt
    TransportFailure {
        /// What kind of failure ended the fetch
        kind: TransportErrorKind,
        /// Error description
        error: String,
        /// Attempts made, first attempt included
        attempts: u32,
    },
}

impl FetchResult {
    /// Content-Type header of a successful fetch, if present and readable
    pub fn content_type(&self) -> Option<&str> {
        match self {
            FetchResult::Success { headers, .. } => headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            _ => None,
        }
    }

    /// HTTP status of a completed exchange
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchResult::Success { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body of a 2xx HTML response, the only kind worth parsing
    pub fn html_body(&self) -> Option<&str> {
        match self {
            FetchResult::Success { status, body, .. }
                if (200..300).contains(status)
                    && self.content_type().is_some_and(is_html_content_type) =>
            {
                Some(body.as_str())
            }
            _ => None,
        }
    }
}

/// Whether a Content-Type value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("text/html") || lowered.contains("application/xhtml+xml")
}

/// Classification of transport-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request or body read exceeded the timeout
    Timeout,
    /// TCP/TLS connection could not be established
    Connect,
    /// Any other failure while sending the request
    Request,
    /// The response body could not be read or decoded
    Body,
    /// Request could not be built or redirects failed
    Other,
}

impl TransportErrorKind {
    fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect
        } else if error.is_body() || error.is_decode() {
            Self::Body
        } else if error.is_request() {
            Self::Request
        } else {
            Self::Other
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::Connect | Self::Request)
    }
}

/// Outcome of one attempt inside the retry loop
enum Attempt {
    /// Final answer, no retry
    Done(FetchResult),
    /// Transient failure; `fallback` is returned if no attempts remain
    Retry { reason: String, fallback: FetchResult },
}

/// Builds an HTTP client with the crawler's user agent and request timeout
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use web_crawler::crawler::build_http_client;
///
/// let client = build_http_client("MyCrawler/1.0", Duration::from_secs(5)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP GET with optional robots.txt enforcement and bounded retry
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Timeout | Retry, `TransportFailure` after the last attempt |
/// | Connection refused | Retry, `TransportFailure` after the last attempt |
/// | Other send error | Retry, `TransportFailure` after the last attempt |
/// | HTTP 5xx | Retry, `Success` with the last 5xx after the last attempt |
/// | Any other status | Immediate `Success` |
/// | Body read/decode error | Immediate `TransportFailure` (retried only on timeout) |
/// | Request build/redirect error | Immediate `TransportFailure` |
///
/// `max_attempts` counts every attempt, so N attempts sleep N-1 times.
#[derive(Debug)]
pub struct FetchClient {
    client: Client,
    robots: Option<RobotsCache>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl FetchClient {
    /// Creates a fetch client
    ///
    /// When `use_robots_txt` is set, a robots.txt cache sharing `client` is
    /// consulted before every request.
    pub fn new(client: Client, user_agent: &str, use_robots_txt: bool, config: &CrawlerConfig) -> Self {
        let robots = use_robots_txt.then(|| RobotsCache::new(client.clone(), user_agent));
        Self {
            client,
            robots,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
        }
    }

    /// Fetches a URL
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        if let Some(robots) = &self.robots {
            if !robots.is_allowed(url).await {
                tracing::info!("Disallowed by robots.txt: {}", url);
                return FetchResult::PolicyBlocked;
            }
        }

        let mut attempt = 1;
        loop {
            tracing::debug!("GET {} (attempt {}/{})", url, attempt, self.max_attempts);

            match self.attempt(url, attempt).await {
                Attempt::Done(result) => return result,
                Attempt::Retry { reason, fallback } => {
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            "Fetch failed for {} after {} attempts: {}",
                            url,
                            attempt,
                            reason
                        );
                        return fallback;
                    }

                    tracing::warn!(
                        "Retrying {} ({}/{}): {}",
                        url,
                        attempt,
                        self.max_attempts,
                        reason
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, url: &Url, attempt: u32) -> Attempt {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return transport_failure(e, attempt),
        };

        let status = response.status();
        let headers = response.headers().clone();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return transport_failure(e, attempt),
        };

        let result = FetchResult::Success {
            status: status.as_u16(),
            body,
            headers,
        };

        if status.is_server_error() {
            Attempt::Retry {
                reason: format!("HTTP {}", status.as_u16()),
                fallback: result,
            }
        } else {
            if status != StatusCode::OK {
                tracing::debug!("{} answered HTTP {}", url, status.as_u16());
            }
            Attempt::Done(result)
        }
    }
}

fn transport_failure(error: reqwest::Error, attempts: u32) -> Attempt {
    let kind = TransportErrorKind::classify(&error);
    let failure = FetchResult::TransportFailure {
        kind,
        error: error.to_string(),
        attempts,
    };

    if kind.is_retryable() {
        Attempt::Retry {
            reason: error.to_string(),
            fallback: failure,
        }
    } else {
        tracing::error!("Non-retryable fetch error: {}", error);
        Attempt::Done(failure)
    }
}
