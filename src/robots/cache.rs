//! Host-keyed robots.txt cache
//!
//! Each host gets one lazily initialized slot. The first caller for a host
//! fetches robots.txt; concurrent callers for the same host wait on that
//! fetch and every later caller reuses its outcome, including a failed fetch.

use crate::robots::{fetch_robots, ParsedRobots};
use crate::url::netloc;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use url::Url;

/// Cached outcome for one host. `None` means robots.txt could not be
/// retrieved and the host is treated as fully allowed.
type HostSlot = Arc<OnceCell<Option<ParsedRobots>>>;

/// Shared robots.txt cache, one entry per host
#[derive(Debug)]
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    hosts: Mutex<HashMap<String, HostSlot>>,
}

impl RobotsCache {
    /// Creates an empty cache that fetches with `client`
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether `url` may be fetched, fetching its host's robots.txt on first use
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let slot = self.slot_for(&netloc(url));
        let robots = slot
            .get_or_init(|| fetch_robots(&self.client, url))
            .await;

        match robots {
            Some(robots) => robots.is_allowed(url.as_str(), &self.user_agent),
            None => true,
        }
    }

    /// Number of hosts with a populated entry
    pub fn len(&self) -> usize {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_for(&self, host: &str) -> HostSlot {
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        hosts.entry(host.to_string()).or_default().clone()
    }
}
