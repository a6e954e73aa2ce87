//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with robots.txt checks and retry logic
//! - HTML parsing, link extraction and metadata extraction
//! - The frontier with deduplication and crawl limits
//! - Page record construction
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod record;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{
    build_http_client, is_html_content_type, FetchClient, FetchResult, TransportErrorKind,
};
pub use frontier::{Frontier, FrontierEntry, DIRECT_ACCESS};
pub use parser::{
    extract_links, extract_metadata, PageMetadata, ParsedPage, EXTRACTION_ERROR, NO_DESCRIPTION,
    NO_H1, NO_TITLE,
};
pub use record::{
    build_record, PageRecord, RecordContext, CONNECTION_ERROR, FETCH_FAILED, PROCESSING_ERROR,
    STATUS_CONNECTION_FAILED, STATUS_NOT_FETCHED,
};
