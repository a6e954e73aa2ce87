//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! A robots.txt that cannot be retrieved never blocks the crawl.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::{product_token, ParsedRobots};

use crate::url::netloc;
use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the host of `url`
///
/// # Returns
///
/// * `Some(ParsedRobots)` - The host answered; a non-success status means it
///   has no robots.txt and everything is allowed
/// * `None` - robots.txt could not be retrieved (timeout, connection failure,
///   unreadable body); callers fail open
pub async fn fetch_robots(client: &Client, url: &Url) -> Option<ParsedRobots> {
    let robots_url = format!("{}://{}/robots.txt", url.scheme(), netloc(url));

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}; allowing all URLs", robots_url, e);
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::info!("No robots.txt at {} (HTTP {}); allowing all URLs", robots_url, status.as_u16());
        return Some(ParsedRobots::allow_all());
    }

    match response.text().await {
        Ok(body) => {
            tracing::info!("Loaded robots.txt: {}", robots_url);
            Some(ParsedRobots::from_content(&body))
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}; allowing all URLs", robots_url, e);
            None
        }
    }
}
