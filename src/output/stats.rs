//! Statistics over a finalized result set
//!
//! This module provides functionality for summarizing page records and
//! displaying the summary at the end of a run.

use crate::crawler::{PageRecord, STATUS_CONNECTION_FAILED, STATUS_NOT_FETCHED};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Total number of records
    pub total_records: usize,

    /// Count of records by status code
    pub by_status: BTreeMap<i32, usize>,

    /// Count of records by depth
    pub by_depth: BTreeMap<u32, usize>,

    /// Records with a 2xx status
    pub successes: usize,

    /// Records with a positive non-2xx status
    pub http_errors: usize,

    /// Records that were blocked or ran out of retries
    pub fetch_failures: usize,

    /// Records whose last attempt could not connect
    pub connection_failures: usize,
}

impl CrawlStatistics {
    pub fn from_records(records: &[PageRecord]) -> Self {
        let mut stats = Self {
            total_records: records.len(),
            ..Self::default()
        };

        for record in records {
            *stats.by_status.entry(record.status_code).or_insert(0) += 1;
            *stats.by_depth.entry(record.depth).or_insert(0) += 1;

            match record.status_code {
                STATUS_NOT_FETCHED => stats.fetch_failures += 1,
                STATUS_CONNECTION_FAILED => stats.connection_failures += 1,
                _ if record.is_success() => stats.successes += 1,
                code if code > 0 => stats.http_errors += 1,
                _ => {}
            }
        }

        stats
    }

    /// Share of records with a 2xx status, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            (self.successes as f64 / self.total_records as f64) * 100.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Total pages recorded: {}", stats.total_records);
    println!("  Successful (2xx): {}", stats.successes);
    println!("  HTTP errors: {}", stats.http_errors);
    println!("  Fetch failures: {}", stats.fetch_failures);
    println!("  Connection failures: {}", stats.connection_failures);
    println!();

    println!("Pages by Status:");
    // Most common status first
    let mut status_counts: Vec<_> = stats.by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in status_counts {
        let percentage = if stats.total_records > 0 {
            (*count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.by_depth.is_empty() {
        println!("Pages by Depth:");
        for (depth, count) in &stats.by_depth {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages)",
        stats.success_rate(),
        stats.successes,
        stats.total_records
    );
}
