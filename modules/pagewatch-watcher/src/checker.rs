//! The check pipeline: guard, load, fetch, extract, normalize, compare,
//! dedup-filter, persist, notify. Persisting the refreshed state strictly
//! before dispatch means a crash between the two loses at most one
//! notification and can never duplicate one on restart.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use pagewatch_common::{Monitor, SelectorRule};
use pagewatch_notify::ChangeNotifier;
use pagewatch_store::MonitorStore;

use crate::dedup::AlertCache;
use crate::diff;
use crate::extractor::{self, ContentExtractor};
use crate::fetcher::PageFetcher;
use crate::guard::CheckGuard;
use crate::normalizer;

/// Spacing between sequential checks in a bulk pass.
const CHECK_ALL_PACING: Duration = Duration::from_millis(500);

/// Result of one check invocation. Every silent no-op path is still
/// distinguishable here so callers and tests can observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Skipped(SkipReason),
    /// No novel items against the baseline.
    Unchanged,
    /// Novel items existed but every one had already been alerted;
    /// content was refreshed, nothing was dispatched.
    Deduplicated,
    /// Notifications dispatched for this many items.
    Notified { items: usize },
    /// Unexpected fault, logged and swallowed; state untouched.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyRunning,
    Missing,
    Disabled,
    NoContent,
}

pub struct Checker {
    store: Arc<MonitorStore>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn ContentExtractor>,
    notifier: Arc<dyn ChangeNotifier>,
    cache: AlertCache,
    guard: CheckGuard,
}

impl Checker {
    pub fn new(
        store: Arc<MonitorStore>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn ContentExtractor>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            notifier,
            cache: AlertCache::new(),
            guard: CheckGuard::new(),
        }
    }

    pub fn store(&self) -> &Arc<MonitorStore> {
        &self.store
    }

    /// Run one check for a monitor. Never propagates a failure: every
    /// error path degrades to "try again next cycle".
    pub async fn check(&self, id: &str) -> CheckOutcome {
        let Some(_permit) = self.guard.try_acquire(id) else {
            debug!(monitor = id, "Check already in flight, dropping request");
            return CheckOutcome::Skipped(SkipReason::AlreadyRunning);
        };

        match self.run_check(id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(monitor = id, error = %e, "Check failed");
                CheckOutcome::Failed
            }
        }
    }

    /// Check every enabled monitor sequentially with a small delay between
    /// them to avoid burst traffic. Returns the number of checks that
    /// dispatched notifications.
    pub async fn check_all(&self) -> usize {
        let ids = self.store.enabled_ids().await;
        let mut notified = 0;
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(CHECK_ALL_PACING).await;
            }
            if matches!(self.check(id).await, CheckOutcome::Notified { .. }) {
                notified += 1;
            }
        }
        notified
    }

    /// Delete a monitor and all its runtime state.
    pub async fn remove_monitor(&self, id: &str) -> Result<Option<Monitor>> {
        let removed = self.store.remove(id).await?;
        self.cache.remove(id).await;
        Ok(removed)
    }

    async fn run_check(&self, id: &str) -> Result<CheckOutcome> {
        let Some(mut monitor) = self.store.get(id).await else {
            debug!(monitor = id, "Unknown monitor, skipping");
            return Ok(CheckOutcome::Skipped(SkipReason::Missing));
        };
        if !monitor.enabled {
            debug!(monitor = id, "Monitor disabled, skipping");
            return Ok(CheckOutcome::Skipped(SkipReason::Disabled));
        }

        self.cache
            .ensure_initialized(id, &monitor.alert_history)
            .await;

        let html = match self.fetcher.fetch(&monitor.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(monitor = id, error = %e, "Fetch rejected");
                String::new()
            }
        };
        if html.is_empty() {
            // Transient failure or empty page; leave state for a future retry.
            return Ok(CheckOutcome::Skipped(SkipReason::NoContent));
        }

        let content = self.extract_content(&html, &monitor.rules);

        let prev_items = normalizer::normalize_content(&monitor.last_content);
        let new_items = normalizer::normalize_content(&content);
        let novel = diff::find_new_items(&prev_items, &new_items);

        monitor.last_check = Some(Utc::now());

        if novel.is_empty() {
            monitor.last_content = content;
            self.store.set(monitor).await?;
            return Ok(CheckOutcome::Unchanged);
        }

        // Items the dedup cache has never alerted on, paired with their hashes.
        let mut truly_new: Vec<(String, String)> = Vec::new();
        for item in novel {
            let hash = normalizer::content_hash(&item);
            if !self.cache.contains(id, &hash).await {
                truly_new.push((item, hash));
            }
        }

        if truly_new.is_empty() {
            monitor.last_content = content;
            self.store.set(monitor).await?;
            return Ok(CheckOutcome::Deduplicated);
        }

        // Cache first, then persist, then dispatch. An interrupted dispatch
        // is never replayed as a duplicate alert after restart.
        for (_, hash) in &truly_new {
            self.cache.insert(id, hash.clone()).await;
        }
        monitor.alert_history = self.cache.snapshot(id).await;
        monitor.last_change = monitor.last_check;
        monitor.last_content = content;
        self.store.set(monitor.clone()).await?;

        let items = truly_new.len();
        let text = truly_new
            .iter()
            .map(|(item, _)| item.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        info!(monitor = %monitor.name, items, "Change detected");

        let report = self.notifier.notify(&monitor, &text).await;
        debug!(monitor = %monitor.name, ?report, "Dispatch complete");

        Ok(CheckOutcome::Notified { items })
    }

    fn extract_content(&self, html: &str, rules: &[SelectorRule]) -> String {
        if rules.is_empty() {
            return extractor::strip_tags(html);
        }
        match self.extractor.extract(html, rules) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                debug!("Selector extraction matched nothing, falling back to tag stripping");
                extractor::strip_tags(html)
            }
            Err(e) => {
                warn!(error = %e, "Selector extraction failed, falling back to tag stripping");
                extractor::strip_tags(html)
            }
        }
    }
}
