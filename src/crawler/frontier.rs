//! Frontier and dedup tracker
//!
//! This module handles:
//! - The FIFO queue of (url, depth) entries awaiting a fetch
//! - The visited set used for deduplication
//! - First-writer-wins referrer attribution
//! - Depth and URL-count limits at admission time
//!
//! All state sits behind one mutex so that admission is a single atomic
//! check-and-insert, even with many link-discovery tasks running at once.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Referrer recorded for the start URL
pub const DIRECT_ACCESS: &str = "Direct Access";

/// A URL queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL
    pub url: String,

    /// Link hops from the start URL
    pub depth: u32,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    referrers: HashMap<String, String>,
    admitted: usize,
}

/// Frontier queue plus dedup state for one crawl run
#[derive(Debug)]
pub struct Frontier {
    max_depth: u32,
    max_urls: usize,
    state: Mutex<FrontierState>,
}

impl Frontier {
    /// Creates an empty frontier with the given limits
    pub fn new(max_depth: u32, max_urls: usize) -> Self {
        Self {
            max_depth,
            max_urls,
            state: Mutex::new(FrontierState::default()),
        }
    }

    /// Queues the start URL at depth 0 with the direct-access referrer
    ///
    /// The start URL is not charged against the URL budget.
    pub fn seed(&self, url: &str) -> bool {
        let mut state = self.lock();
        if !state.visited.insert(url.to_string()) {
            return false;
        }
        state
            .referrers
            .insert(url.to_string(), DIRECT_ACCESS.to_string());
        state.queue.push_back(FrontierEntry {
            url: url.to_string(),
            depth: 0,
        });

        tracing::debug!("Seeded frontier with {}", url);
        true
    }

    /// Admits a URL if it is new and within limits
    ///
    /// Atomically checks the visited set and, when the URL is absent, the depth
    /// is at most `max_depth` and fewer than `max_urls` URLs were admitted so
    /// far, marks it visited, records `referrer` and enqueues it.
    ///
    /// # Returns
    ///
    /// * `true` - The URL was admitted and queued
    /// * `false` - Already visited, too deep, or the URL budget is spent
    pub fn admit(&self, url: &str, depth: u32, referrer: &str) -> bool {
        if depth > self.max_depth {
            tracing::trace!("Not admitting {} at depth {}: beyond max depth", url, depth);
            return false;
        }

        let mut state = self.lock();

        if state.admitted >= self.max_urls {
            tracing::trace!("Not admitting {}: URL budget spent", url);
            return false;
        }

        if !state.visited.insert(url.to_string()) {
            return false;
        }

        state
            .referrers
            .entry(url.to_string())
            .or_insert_with(|| referrer.to_string());
        state.queue.push_back(FrontierEntry {
            url: url.to_string(),
            depth,
        });
        state.admitted += 1;

        tracing::debug!("Admitted {} (depth {}, from {})", url, depth, referrer);
        true
    }

    /// Removes up to `size` entries from the front of the queue
    pub fn next_batch(&self, size: usize) -> Vec<FrontierEntry> {
        let mut state = self.lock();
        let take = size.min(state.queue.len());
        state.queue.drain(..take).collect()
    }

    /// Referrer recorded when `url` was admitted
    pub fn referrer(&self, url: &str) -> String {
        self.lock()
            .referrers
            .get(url)
            .cloned()
            .unwrap_or_else(|| DIRECT_ACCESS.to_string())
    }

    /// Number of discovered URLs admitted so far, excluding the start URL
    pub fn admitted_count(&self) -> usize {
        self.lock().admitted
    }

    /// Whether the URL budget has been spent
    pub fn budget_exhausted(&self) -> bool {
        self.admitted_count() >= self.max_urls
    }

    /// Whether `url` was ever admitted
    pub fn contains(&self, url: &str) -> bool {
        self.lock().visited.contains(url)
    }

    /// Number of entries waiting in the queue
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_seed_uses_direct_access() {
        let frontier = Frontier::new(3, 10);
        assert!(frontier.seed("https://example.com/"));
        assert_eq!(frontier.referrer("https://example.com/"), DIRECT_ACCESS);
        assert_eq!(
            frontier.next_batch(4),
            vec![FrontierEntry {
                url: "https://example.com/".to_string(),
                depth: 0
            }]
        );
    }

    #[test]
    fn test_admit_once() {
        let frontier = Frontier::new(3, 10);
        assert!(frontier.admit("https://example.com/a", 1, "https://example.com/"));
        assert!(!frontier.admit("https://example.com/a", 1, "https://example.com/b"));
        assert!(!frontier.admit("https://example.com/a", 2, "https://example.com/c"));
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.admitted_count(), 1);
    }

    #[test]
    fn test_first_referrer_wins() {
        let frontier = Frontier::new(3, 10);
        frontier.admit("https://example.com/a", 1, "https://example.com/first");
        frontier.admit("https://example.com/a", 1, "https://example.com/second");
        assert_eq!(
            frontier.referrer("https://example.com/a"),
            "https://example.com/first"
        );
    }

    #[test]
    fn test_depth_limit() {
        let frontier = Frontier::new(2, 10);
        assert!(frontier.admit("https://example.com/two", 2, "r"));
        assert!(!frontier.admit("https://example.com/three", 3, "r"));
        assert!(!frontier.contains("https://example.com/three"));
    }

    #[test]
    fn test_url_budget() {
        let frontier = Frontier::new(5, 2);
        assert!(frontier.seed("https://example.com/"));
        assert_eq!(frontier.admitted_count(), 0);
        assert!(frontier.admit("https://example.com/a", 1, "https://example.com/"));
        assert!(!frontier.budget_exhausted());
        assert!(frontier.admit("https://example.com/b", 1, "https://example.com/"));
        assert!(frontier.budget_exhausted());
        assert!(!frontier.admit("https://example.com/c", 1, "https://example.com/"));
        assert!(!frontier.contains("https://example.com/c"));
        assert_eq!(frontier.admitted_count(), 2);
        assert_eq!(frontier.len(), 3);
    }

    #[test]
    fn test_batches_are_fifo() {
        let frontier = Frontier::new(5, 100);
        for i in 0..5 {
            frontier.admit(&format!("https://example.com/{}", i), 1, "r");
        }

        let first: Vec<String> = frontier.next_batch(2).into_iter().map(|e| e.url).collect();
        let second: Vec<String> = frontier.next_batch(2).into_iter().map(|e| e.url).collect();
        let third: Vec<String> = frontier.next_batch(2).into_iter().map(|e| e.url).collect();

        assert_eq!(first, vec!["https://example.com/0", "https://example.com/1"]);
        assert_eq!(second, vec!["https://example.com/2", "https://example.com/3"]);
        assert_eq!(third, vec!["https://example.com/4"]);
        assert!(frontier.is_empty());
        assert!(frontier.next_batch(2).is_empty());
    }

    #[test]
    fn test_dequeued_url_stays_visited() {
        let frontier = Frontier::new(5, 100);
        frontier.seed("https://example.com/");
        frontier.next_batch(1);
        assert!(!frontier.admit("https://example.com/", 1, "https://example.com/a"));
    }

    #[test]
    fn test_concurrent_admission_is_exactly_once() {
        let frontier = Arc::new(Frontier::new(5, 10_000));
        let mut handles = Vec::new();

        for worker in 0..8 {
            let frontier = Arc::clone(&frontier);
            handles.push(std::thread::spawn(move || {
                let mut won = 0;
                for i in 0..200 {
                    let referrer = format!("https://example.com/worker{}", worker);
                    if frontier.admit(&format!("https://example.com/p{}", i), 1, &referrer) {
                        won += 1;
                    }
                }
                won
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 200);
        assert_eq!(frontier.admitted_count(), 200);
        assert_eq!(frontier.len(), 200);
    }

    #[test]
    fn test_concurrent_admission_respects_budget() {
        let frontier = Arc::new(Frontier::new(5, 50));
        let mut handles = Vec::new();

        for worker in 0..4 {
            let frontier = Arc::clone(&frontier);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    frontier.admit(&format!("https://example.com/w{}/{}", worker, i), 1, "r");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frontier.admitted_count(), 50);
        assert_eq!(frontier.len(), 50);
    }
}
