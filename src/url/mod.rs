//! URL handling module
//!
//! This module provides URL normalization for deduplication and the
//! same-domain test used to keep the crawl on one site.

mod domain;
mod normalize;

pub use domain::{is_same_domain, netloc};
pub use normalize::normalize_url;
