use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes deliveries to a shared endpoint with a minimum spacing.
///
/// Multiple monitors can point at the same webhook URL, and their checks run
/// concurrently, so the last-delivery time is a shared resource. Callers
/// reserve a send slot under the mutex and then sleep until their slot, so
/// two concurrent reservations can never land inside one spacing window.
pub struct EndpointPacer {
    min_interval: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl EndpointPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// Wait until this endpoint's next free slot. Returns after the caller
    /// is clear to send.
    pub async fn wait_turn(&self, endpoint: &str) {
        let wait = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots
                .get(endpoint)
                .copied()
                .unwrap_or(now)
                .max(now);
            slots.insert(endpoint.to_string(), slot + self.min_interval);
            slot.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
