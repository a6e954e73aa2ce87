use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Absolute URL the crawl starts from; its netloc is the crawl domain
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// User agent sent with every request and matched against robots.txt
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whether robots.txt is consulted before each fetch
    #[serde(rename = "use-robots-txt", default)]
    pub use_robots_txt: bool,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl limits and pacing
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum link depth from the start URL
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of discovered URLs admitted to the frontier; the start URL is not counted
    #[serde(rename = "max-urls", default = "default_max_urls")]
    pub max_urls: usize,

    /// Worker pool size, also the batch size
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pause between batches (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Total attempts per fetch, first attempt included
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between fetch attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Fetch each URL once and feed both link discovery and record production
    #[serde(rename = "shared-fetch", default)]
    pub shared_fetch: bool,
}

impl CrawlerConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_urls: default_max_urls(),
            workers: default_workers(),
            batch_delay_ms: default_batch_delay_ms(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            shared_fetch: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for the append-log, final result, latest copy and manifest
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

fn default_max_depth() -> u32 {
    10
}

fn default_max_urls() -> usize {
    5000
}

fn default_workers() -> usize {
    4
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_output_directory() -> String {
    "output".to_string()
}
