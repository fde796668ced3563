//! Periodic check triggering. The check pipeline itself contains no timer
//! logic; it only exposes `check(id)`, and this module decides when to call
//! it. Ticks get ±10% jitter so a monitor's requests do not land on an
//! exact clockwork cadence.
//!
//! Cancellation only stops the ticking. A check that is already running is
//! never interrupted from outside; it finishes on its own and the loop
//! exits at the next tick boundary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tracing::info;

use crate::checker::Checker;

/// Delay before the first check of a freshly scheduled monitor.
const INITIAL_CHECK_DELAY: Duration = Duration::from_secs(1);

/// Trigger interface the rest of the system depends on.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, id: &str, interval: Duration);
    fn cancel(&self, id: &str);
    fn cancel_all(&self);
}

/// Tokio-task-per-monitor scheduler. Each entry holds the stop signal for
/// that monitor's tick loop; the loop consults it only between checks.
pub struct TokioScheduler {
    checker: Arc<Checker>,
    tasks: Mutex<HashMap<String, Arc<Notify>>>,
}

impl TokioScheduler {
    pub fn new(checker: Arc<Checker>) -> Self {
        Self {
            checker,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Re-read the store and re-establish triggers for every enabled
    /// monitor. Safe to call repeatedly; existing triggers are replaced.
    pub async fn reload(&self) {
        self.cancel_all();
        let monitors = self.checker.store().list().await;
        let mut scheduled = 0;
        for monitor in &monitors {
            if monitor.enabled {
                self.schedule(
                    &monitor.id,
                    Duration::from_secs(monitor.effective_interval_secs()),
                );
                scheduled += 1;
            }
        }
        info!(total = monitors.len(), scheduled, "Schedule reloaded");
    }

    pub fn scheduled_count(&self) -> usize {
        self.tasks.lock().expect("scheduler mutex poisoned").len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, id: &str, interval: Duration) {
        let checker = Arc::clone(&self.checker);
        let task_id = id.to_string();
        let stop = Arc::new(Notify::new());
        let task_stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if stopped_during(&task_stop, INITIAL_CHECK_DELAY).await {
                return;
            }
            checker.check(&task_id).await;
            loop {
                if stopped_during(&task_stop, jittered(interval)).await {
                    return;
                }
                checker.check(&task_id).await;
            }
        });

        let mut tasks = self.tasks.lock().expect("scheduler mutex poisoned");
        if let Some(old) = tasks.insert(id.to_string(), stop) {
            old.notify_one();
        }
    }

    fn cancel(&self, id: &str) {
        let mut tasks = self.tasks.lock().expect("scheduler mutex poisoned");
        if let Some(stop) = tasks.remove(id) {
            stop.notify_one();
        }
    }

    fn cancel_all(&self) {
        let mut tasks = self.tasks.lock().expect("scheduler mutex poisoned");
        for (_, stop) in tasks.drain() {
            stop.notify_one();
        }
    }
}

/// Sleep for `delay`, returning early with `true` if the stop signal fires.
/// A signal that arrives while a check is running is not lost; `Notify`
/// stores the permit and the next call returns immediately.
async fn stopped_during(stop: &Notify, delay: Duration) -> bool {
    tokio::select! {
        _ = stop.notified() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Interval with ±10% random jitter.
fn jittered(interval: Duration) -> Duration {
    interval.mul_f64(rand::rng().random_range(0.9..=1.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pagewatch_notify::Notifier;
    use pagewatch_store::MonitorStore;
    use tempfile::TempDir;

    use crate::extractor::SelectorExtractor;
    use crate::fetcher::HttpFetcher;

    async fn test_checker(dir: &TempDir) -> Arc<Checker> {
        let store = Arc::new(
            MonitorStore::open(dir.path().join("pagewatch.json"))
                .await
                .unwrap(),
        );
        Arc::new(Checker::new(
            store,
            Arc::new(HttpFetcher::new(1).unwrap()),
            Arc::new(SelectorExtractor),
            Arc::new(Notifier::new(Duration::from_millis(500)).unwrap()),
        ))
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let base = Duration::from_secs(100);
        for _ in 0..200 {
            let j = jittered(base);
            assert!(j >= Duration::from_secs(90), "{j:?}");
            assert!(j <= Duration::from_secs(110), "{j:?}");
        }
    }

    #[tokio::test]
    async fn schedule_and_cancel_track_tasks() {
        let dir = TempDir::new().unwrap();
        let scheduler = TokioScheduler::new(test_checker(&dir).await);

        scheduler.schedule("m1", Duration::from_secs(60));
        scheduler.schedule("m2", Duration::from_secs(60));
        assert_eq!(scheduler.scheduled_count(), 2);

        // Rescheduling the same id replaces, not duplicates.
        scheduler.schedule("m1", Duration::from_secs(120));
        assert_eq!(scheduler.scheduled_count(), 2);

        scheduler.cancel("m1");
        assert_eq!(scheduler.scheduled_count(), 1);
        scheduler.cancel_all();
        assert_eq!(scheduler.scheduled_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_lets_in_flight_check_finish() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use anyhow::Result;
        use async_trait::async_trait;
        use pagewatch_common::Monitor;

        use crate::fetcher::PageFetcher;

        struct GatedFetcher {
            entered: Notify,
            release: Notify,
            fetches: AtomicUsize,
        }

        #[async_trait]
        impl PageFetcher for GatedFetcher {
            async fn fetch(&self, _url: &str) -> Result<String> {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                self.entered.notify_one();
                self.release.notified().await;
                Ok("<p>A sufficiently long headline here</p>".to_string())
            }
        }

        let dir = TempDir::new().unwrap();
        let store = Arc::new(
            MonitorStore::open(dir.path().join("pagewatch.json"))
                .await
                .unwrap(),
        );
        store
            .set(Monitor::new("m1", "Example", "https://example.com/a"))
            .await
            .unwrap();
        let fetcher = Arc::new(GatedFetcher {
            entered: Notify::new(),
            release: Notify::new(),
            fetches: AtomicUsize::new(0),
        });
        let checker = Arc::new(Checker::new(
            store.clone(),
            fetcher.clone(),
            Arc::new(SelectorExtractor),
            Arc::new(Notifier::new(Duration::from_millis(500)).unwrap()),
        ));
        let scheduler = TokioScheduler::new(checker);

        scheduler.schedule("m1", Duration::from_secs(60));
        fetcher.entered.notified().await;

        // Cancel while the first check is inside the fetch. The check must
        // still run to completion and write its state back.
        scheduler.cancel("m1");
        assert_eq!(scheduler.scheduled_count(), 0);
        fetcher.release.notify_one();

        let mut done = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if store.get("m1").await.unwrap().last_check.is_some() {
                done = true;
                break;
            }
        }
        assert!(done, "cancelled check never completed");

        // The loop itself stopped: well past the next tick, no second fetch.
        fetcher.release.notify_one();
        tokio::time::sleep(Duration::from_secs(180)).await;
        assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reload_schedules_only_enabled_monitors() {
        use pagewatch_common::Monitor;

        let dir = TempDir::new().unwrap();
        let checker = test_checker(&dir).await;
        checker
            .store()
            .set(Monitor::new("on", "On", "https://example.com/a"))
            .await
            .unwrap();
        let mut off = Monitor::new("off", "Off", "https://example.com/b");
        off.enabled = false;
        checker.store().set(off).await.unwrap();

        let scheduler = TokioScheduler::new(checker);
        scheduler.reload().await;
        assert_eq!(scheduler.scheduled_count(), 1);
        scheduler.cancel_all();
    }
}
