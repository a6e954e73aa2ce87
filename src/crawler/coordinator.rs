//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the breadth-first batch loop, including:
//! - Seeding the frontier with the start URL
//! - Fanning each batch out to link-discovery and record-production tasks
//! - Waiting for the whole batch before the next one starts
//! - Forwarding page records to the recorder and finalizing the run

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{build_http_client, FetchClient, FetchResult};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::{extract_links, ParsedPage};
use crate::crawler::record::{build_record, PageRecord, RecordContext, FETCH_FAILED, STATUS_NOT_FETCHED};
use crate::output::{FinalizedRun, Recorder, RunPaths};
use crate::url::{netloc, normalize_url};
use crate::CrawlerError;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// State shared by every task of a run
struct CrawlContext {
    fetcher: FetchClient,
    frontier: Frontier,
    /// Netloc of the start URL; links must contain it to be followed
    domain: String,
    /// Worker pool; one permit per in-flight fetch
    workers: Semaphore,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    context: Arc<CrawlContext>,
    recorder: Arc<Recorder>,
    start_url: Url,
    config: CrawlerConfig,
}

impl Coordinator {
    /// Creates a coordinator writing under the configured output root
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run; the append-log exists with its header
    /// * `Err(CrawlerError)` - Bad start URL, HTTP client or output setup failure
    pub fn new(config: Config) -> Result<Self, CrawlerError> {
        let paths = RunPaths::for_today(&config.output.directory);
        Self::with_paths(config, paths)
    }

    /// Creates a coordinator writing to explicit run paths
    pub fn with_paths(config: Config, paths: RunPaths) -> Result<Self, CrawlerError> {
        let start_url = normalize_url(&config.start_url)?;
        let domain = netloc(&start_url);

        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
        let fetcher = FetchClient::new(
            client,
            &config.user_agent,
            config.use_robots_txt,
            &config.crawler,
        );
        let frontier = Frontier::new(config.crawler.max_depth, config.crawler.max_urls);
        let recorder = Recorder::initialize(paths, start_url.as_str())?;

        tracing::info!(
            "Crawling {} (domain {}, {} workers, max depth {}, max {} URLs, robots.txt {})",
            start_url,
            domain,
            config.crawler.workers,
            config.crawler.max_depth,
            config.crawler.max_urls,
            if config.use_robots_txt { "on" } else { "off" }
        );

        Ok(Self {
            context: Arc::new(CrawlContext {
                fetcher,
                frontier,
                domain,
                workers: Semaphore::new(config.crawler.workers.max(1)),
            }),
            recorder: Arc::new(recorder),
            start_url,
            config: config.crawler,
        })
    }

    /// Run paths of the recorder
    pub fn paths(&self) -> &RunPaths {
        self.recorder.paths()
    }

    /// Runs the crawl to completion and finalizes the result
    ///
    /// Batches of up to `workers` frontier entries are processed until the
    /// frontier drains or the URL budget is spent. Per-URL failures become
    /// records; only recorder finalization errors are returned.
    pub async fn run(&self) -> Result<FinalizedRun, CrawlerError> {
        let frontier = &self.context.frontier;
        frontier.seed(self.start_url.as_str());

        let start_time = Instant::now();
        let mut batches = 0usize;
        let mut recorded = 0usize;

        loop {
            if frontier.budget_exhausted() {
                if !frontier.is_empty() {
                    tracing::warn!(
                        "URL budget of {} reached; {} queued URLs will not be visited",
                        self.config.max_urls,
                        frontier.len()
                    );
                }
                break;
            }

            let batch = frontier.next_batch(self.config.workers.max(1));
            if batch.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            }

            batches += 1;
            tracing::info!(
                "Batch {}: {} URLs at depth {}..={}, {} still queued",
                batches,
                batch.len(),
                batch.iter().map(|e| e.depth).min().unwrap_or_default(),
                batch.iter().map(|e| e.depth).max().unwrap_or_default(),
                frontier.len()
            );

            let admitted_before = frontier.admitted_count();
            let written = self.run_batch(batch).await;
            recorded += written;
            tracing::info!(
                "Batch {} done: {} records, {} new URLs admitted",
                batches,
                written,
                frontier.admitted_count() - admitted_before
            );

            // Progress reporting every 10 batches
            if batches % 10 == 0 {
                let rate = recorded as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages recorded, {} admitted, {} in frontier, {:.2} pages/sec",
                    recorded,
                    frontier.admitted_count(),
                    frontier.len(),
                    rate
                );
            }

            if !frontier.is_empty() && !frontier.budget_exhausted() {
                tokio::time::sleep(self.config.batch_delay()).await;
            }
        }

        tracing::info!(
            "Crawl completed: {} pages recorded in {} batches in {:?}",
            recorded,
            batches,
            start_time.elapsed()
        );

        // Finalizing rewrites whole files
        let recorder = Arc::clone(&self.recorder);
        let run = tokio::task::spawn_blocking(move || recorder.finalize()).await??;
        tracing::info!(
            "Finalized {} records ({} successful) into {}",
            run.statistics.total_records,
            run.statistics.successes,
            run.final_path.display()
        );
        Ok(run)
    }

    /// Processes one batch and waits for every task in it
    ///
    /// Returns the number of records written.
    async fn run_batch(&self, batch: Vec<FrontierEntry>) -> usize {
        let mut tasks: JoinSet<Option<PageRecord>> = JoinSet::new();
        let mut written = 0;

        for entry in batch {
            let referrer = self.context.frontier.referrer(&entry.url);
            let url = match Url::parse(&entry.url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("Queued URL {} does not parse: {}", entry.url, e);
                    let record = PageRecord::sentinel(
                        &entry.url,
                        STATUS_NOT_FETCHED,
                        FETCH_FAILED,
                        &referrer,
                        entry.depth,
                    );
                    written += usize::from(self.record(&record));
                    continue;
                }
            };
            let record_context = RecordContext::new(url, referrer, entry.depth);

            if self.config.shared_fetch {
                let context = Arc::clone(&self.context);
                tasks.spawn(async move { Some(process_page(context, record_context).await) });
            } else {
                let context = Arc::clone(&self.context);
                let page = record_context.clone();
                tasks.spawn(async move {
                    discover_links(context, page).await;
                    None
                });

                let context = Arc::clone(&self.context);
                tasks.spawn(async move { Some(produce_record(context, record_context).await) });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(record)) => written += usize::from(self.record(&record)),
                Ok(None) => {}
                Err(e) => tracing::error!("Crawl task failed: {}", e),
            }
        }

        written
    }

    fn record(&self, record: &PageRecord) -> bool {
        match self.recorder.write(record) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to record {}: {}", record.url, e);
                false
            }
        }
    }
}

/// Fetches a page and admits its links one level deeper
async fn discover_links(context: Arc<CrawlContext>, page: RecordContext) {
    if page.depth >= context.frontier.max_depth() {
        tracing::trace!("Not following links on {}: at max depth", page.url);
        return;
    }

    let fetch = fetch_with_permit(&context, &page.url).await;

    let url = page.url.clone();
    let domain = context.domain.clone();
    let links = tokio::task::spawn_blocking(move || {
        fetch
            .html_body()
            .map(|body| extract_links(body, &url, &domain))
            .unwrap_or_default()
    })
    .await;

    match links {
        Ok(links) => admit_links(&context, &page, &links),
        Err(e) => tracing::error!("Link extraction failed for {}: {}", page.url, e),
    }
}

/// Fetches a page and builds its record
async fn produce_record(context: Arc<CrawlContext>, page: RecordContext) -> PageRecord {
    let fetch = fetch_with_permit(&context, &page.url).await;
    let status = fetch.status();

    let record_context = page.clone();
    match tokio::task::spawn_blocking(move || build_record(&record_context, &fetch, None)).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("Processing failed for {}: {}", page.url, e);
            page.processing_error(status)
        }
    }
}

/// Fetches a page once and derives both its links and its record
async fn process_page(context: Arc<CrawlContext>, page: RecordContext) -> PageRecord {
    let fetch = fetch_with_permit(&context, &page.url).await;
    let status = fetch.status();
    let follow_links = page.depth < context.frontier.max_depth();

    let record_context = page.clone();
    let domain = context.domain.clone();
    let processed = tokio::task::spawn_blocking(move || {
        match fetch.html_body() {
            Some(body) => {
                let parsed = ParsedPage::parse(body);
                let links = if follow_links {
                    parsed.links(&record_context.url, &domain)
                } else {
                    Vec::new()
                };
                (links, build_record(&record_context, &fetch, Some(&parsed)))
            }
            None => (Vec::new(), build_record(&record_context, &fetch, None)),
        }
    })
    .await;

    match processed {
        Ok((links, record)) => {
            admit_links(&context, &page, &links);
            record
        }
        Err(e) => {
            tracing::error!("Processing failed for {}: {}", page.url, e);
            page.processing_error(status)
        }
    }
}

async fn fetch_with_permit(context: &CrawlContext, url: &Url) -> FetchResult {
    // Never closed
    let _permit = context.workers.acquire().await.ok();
    let started = Instant::now();
    let result = context.fetcher.fetch(url).await;
    tracing::debug!("Fetched {} in {:?}", url, started.elapsed());
    result
}

fn admit_links(context: &CrawlContext, page: &RecordContext, links: &[String]) {
    let referrer = page.url.as_str();
    let admitted = links
        .iter()
        .filter(|link| context.frontier.admit(link, page.depth + 1, referrer))
        .count();

    tracing::debug!(
        "{}: {} links found, {} admitted at depth {}",
        page.url,
        links.len(),
        admitted,
        page.depth + 1
    );
}

/// Runs a complete crawl with the given configuration
///
/// # Returns
///
/// * `Ok(FinalizedRun)` - Locations and statistics of the published result
/// * `Err(CrawlerError)` - Startup or finalization failed
pub async fn run_crawl(config: Config) -> Result<FinalizedRun, CrawlerError> {
    Coordinator::new(config)?.run().await
}
