//! JSON-file-backed monitor store.
//!
//! Holds the full monitor map in memory behind a mutex and writes the whole
//! file back on every mutation (temp file + rename, so a crash mid-write
//! never corrupts the store). Each call is atomic on its own; a
//! read-then-write pair is not transactional; the per-monitor check guard
//! is what keeps two writers off the same record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use pagewatch_common::{Monitor, PagewatchError};

type Result<T> = std::result::Result<T, PagewatchError>;

/// On-disk shape: a single object keyed by monitor id.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    monitors: HashMap<String, Monitor>,
}

pub struct MonitorStore {
    path: PathBuf,
    monitors: Mutex<HashMap<String, Monitor>>,
}

impl MonitorStore {
    /// Open the store at `path`, loading existing monitors if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let monitors = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: StoreFile = serde_json::from_slice(&bytes).map_err(|e| {
                    PagewatchError::Store(format!("malformed store file {}: {e}", path.display()))
                })?;
                file.monitors
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(PagewatchError::Store(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        info!(path = %path.display(), monitors = monitors.len(), "Monitor store opened");
        Ok(Self {
            path,
            monitors: Mutex::new(monitors),
        })
    }

    pub async fn get(&self, id: &str) -> Option<Monitor> {
        self.monitors.lock().await.get(id).cloned()
    }

    /// Insert or replace a monitor and flush to disk.
    pub async fn set(&self, monitor: Monitor) -> Result<()> {
        let mut monitors = self.monitors.lock().await;
        monitors.insert(monitor.id.clone(), monitor);
        self.flush(&monitors).await
    }

    /// Remove a monitor, flushing if it existed.
    pub async fn remove(&self, id: &str) -> Result<Option<Monitor>> {
        let mut monitors = self.monitors.lock().await;
        let removed = monitors.remove(id);
        if removed.is_some() {
            self.flush(&monitors).await?;
        }
        Ok(removed)
    }

    /// All monitors, unordered.
    pub async fn list(&self) -> Vec<Monitor> {
        self.monitors.lock().await.values().cloned().collect()
    }

    /// Ids of enabled monitors.
    pub async fn enabled_ids(&self) -> Vec<String> {
        self.monitors
            .lock()
            .await
            .values()
            .filter(|m| m.enabled)
            .map(|m| m.id.clone())
            .collect()
    }

    async fn flush(&self, monitors: &HashMap<String, Monitor>) -> Result<()> {
        let file = StoreFile {
            monitors: monitors.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| PagewatchError::Store(format!("failed to serialize store: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            PagewatchError::Store(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            PagewatchError::Store(format!("failed to replace {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewatch_common::SelectorRule;
    use tempfile::TempDir;

    fn sample(id: &str) -> Monitor {
        let mut m = Monitor::new(id, "Example", "https://example.com/news");
        m.rules = vec![SelectorRule::text(".headline")];
        m.webhook_url = Some("https://hooks.example.com/abc".to_string());
        m
    }

    #[tokio::test]
    async fn open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::open(dir.path().join("pagewatch.json"))
            .await
            .unwrap();
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn set_get_roundtrip_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pagewatch.json");

        let store = MonitorStore::open(&path).await.unwrap();
        store.set(sample("m1")).await.unwrap();
        drop(store);

        let store = MonitorStore::open(&path).await.unwrap();
        let loaded = store.get("m1").await.unwrap();
        assert_eq!(loaded, sample("m1"));
    }

    #[tokio::test]
    async fn set_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::open(dir.path().join("pagewatch.json"))
            .await
            .unwrap();

        store.set(sample("m1")).await.unwrap();
        let mut updated = sample("m1");
        updated.last_content = "new content".to_string();
        updated.alert_history = vec!["12345".to_string()];
        store.set(updated.clone()).await.unwrap();

        assert_eq!(store.get("m1").await.unwrap(), updated);
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_and_reports() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::open(dir.path().join("pagewatch.json"))
            .await
            .unwrap();

        store.set(sample("m1")).await.unwrap();
        assert!(store.remove("m1").await.unwrap().is_some());
        assert!(store.remove("m1").await.unwrap().is_none());
        assert!(store.get("m1").await.is_none());
    }

    #[tokio::test]
    async fn enabled_ids_filters_disabled() {
        let dir = TempDir::new().unwrap();
        let store = MonitorStore::open(dir.path().join("pagewatch.json"))
            .await
            .unwrap();

        store.set(sample("m1")).await.unwrap();
        let mut off = sample("m2");
        off.enabled = false;
        store.set(off).await.unwrap();

        assert_eq!(store.enabled_ids().await, vec!["m1".to_string()]);
    }
}
