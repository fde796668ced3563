//! Per-monitor cache of content hashes that have already produced an alert.
//! Lives for the process lifetime and is seeded lazily from each monitor's
//! persisted history, so a restart cannot replay old alerts.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use pagewatch_common::ALERT_HISTORY_LIMIT;

#[derive(Default)]
struct MonitorCache {
    /// Hashes in insertion order, for the persisted snapshot.
    order: Vec<String>,
    /// Same hashes, for O(1) membership.
    seen: HashSet<String>,
}

impl MonitorCache {
    fn insert(&mut self, hash: String) {
        if self.seen.insert(hash.clone()) {
            self.order.push(hash);
        }
    }
}

/// Process-wide alert dedup cache, keyed by monitor id.
#[derive(Default)]
pub struct AlertCache {
    caches: Mutex<HashMap<String, MonitorCache>>,
}

impl AlertCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache for a monitor from its persisted history. Only the
    /// first call per monitor does anything; later calls are no-ops so an
    /// in-flight process never loses hashes inserted since startup.
    pub async fn ensure_initialized(&self, id: &str, persisted: &[String]) {
        let mut caches = self.caches.lock().await;
        caches.entry(id.to_string()).or_insert_with(|| {
            let mut cache = MonitorCache::default();
            for hash in persisted {
                cache.insert(hash.clone());
            }
            cache
        });
    }

    pub async fn contains(&self, id: &str, hash: &str) -> bool {
        self.caches
            .lock()
            .await
            .get(id)
            .is_some_and(|c| c.seen.contains(hash))
    }

    /// Record a hash as alerted. Happens before any dispatch so a failed or
    /// interrupted delivery can never be retried into a duplicate alert.
    pub async fn insert(&self, id: &str, hash: String) {
        self.caches
            .lock()
            .await
            .entry(id.to_string())
            .or_default()
            .insert(hash);
    }

    /// The most recently inserted hashes, capped at the persisted history
    /// limit, oldest first.
    pub async fn snapshot(&self, id: &str) -> Vec<String> {
        let caches = self.caches.lock().await;
        let Some(cache) = caches.get(id) else {
            return Vec::new();
        };
        let skip = cache.order.len().saturating_sub(ALERT_HISTORY_LIMIT);
        cache.order[skip..].to_vec()
    }

    /// Drop all state for a deleted monitor.
    pub async fn remove(&self, id: &str) {
        self.caches.lock().await.remove(id);
    }
}
