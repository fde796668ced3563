//! Per-monitor single-flight guard. A check request that arrives while
//! another check for the same monitor is in flight is dropped, not queued;
//! the next scheduled tick retries naturally.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct CheckGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of one check. Releases on drop, which covers every
/// exit path: success, early return, `?`, and panic unwinding.
pub struct CheckPermit {
    id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl CheckGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as in flight. Returns `None` if a check is already running.
    pub fn try_acquire(&self, id: &str) -> Option<CheckPermit> {
        let mut in_flight = self.in_flight.lock().expect("guard mutex poisoned");
        if !in_flight.insert(id.to_string()) {
            return None;
        }
        Some(CheckPermit {
            id: id.to_string(),
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

impl Drop for CheckPermit {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.id);
        }
    }
}
