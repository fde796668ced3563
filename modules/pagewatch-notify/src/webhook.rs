use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use crate::message;
use crate::pacer::EndpointPacer;

/// Extra wait added on top of a server-indicated retry delay.
const RETRY_BUFFER: Duration = Duration::from_millis(100);

/// What happened to one webhook delivery. Delivery is best-effort, so
/// failures surface here (and in the log) instead of as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// Sent on the second attempt after a throttling response.
    SentAfterRetry,
    /// Composed message was empty or too short to bother the endpoint with.
    SkippedEmpty,
    /// Gave up: second throttle, non-success status, or transport error.
    Dropped(String),
}

/// Posts change messages to webhook endpoints, spacing deliveries to each
/// endpoint and retrying once on throttling.
pub struct WebhookSender {
    http: reqwest::Client,
    pacer: EndpointPacer,
}

impl WebhookSender {
    pub fn new(min_interval: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            pacer: EndpointPacer::new(min_interval),
        })
    }

    /// Deliver a change notification for one monitor. Never returns an
    /// error; the outcome says whether anything actually went out.
    pub async fn send(
        &self,
        endpoint: &str,
        monitor_name: &str,
        monitor_url: &str,
        new_items_text: &str,
    ) -> DeliveryOutcome {
        let Some(content) = message::compose(monitor_name, monitor_url, new_items_text) else {
            return DeliveryOutcome::SkippedEmpty;
        };

        let payload = json!({
            "content": content,
            "username": "Pagewatch",
        });

        self.pacer.wait_turn(endpoint).await;

        match self.post(endpoint, &payload).await {
            PostResult::Ok => {
                info!(monitor = monitor_name, "Webhook delivered");
                DeliveryOutcome::Sent
            }
            PostResult::Throttled(delay) => {
                info!(
                    monitor = monitor_name,
                    delay_ms = delay.as_millis() as u64,
                    "Webhook throttled, retrying once"
                );
                tokio::time::sleep(delay).await;
                match self.post(endpoint, &payload).await {
                    PostResult::Ok => DeliveryOutcome::SentAfterRetry,
                    PostResult::Throttled(_) => {
                        warn!(monitor = monitor_name, "Webhook throttled twice, dropping");
                        DeliveryOutcome::Dropped("throttled twice".to_string())
                    }
                    PostResult::Failed(reason) => {
                        warn!(monitor = monitor_name, reason, "Webhook retry failed, dropping");
                        DeliveryOutcome::Dropped(reason)
                    }
                }
            }
            PostResult::Failed(reason) => {
                warn!(monitor = monitor_name, reason, "Webhook delivery failed");
                DeliveryOutcome::Dropped(reason)
            }
        }
    }

    async fn post(&self, endpoint: &str, payload: &serde_json::Value) -> PostResult {
        let resp = match self.http.post(endpoint).json(payload).send().await {
            Ok(r) => r,
            Err(e) => return PostResult::Failed(e.to_string()),
        };

        let status = resp.status();
        if status.is_success() {
            return PostResult::Ok;
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = resp.json::<serde_json::Value>().await.unwrap_or_default();
            return PostResult::Throttled(retry_delay(&body));
        }
        PostResult::Failed(format!("status {status}"))
    }
}

enum PostResult {
    Ok,
    Throttled(Duration),
    Failed(String),
}

/// Server-indicated retry delay plus a small buffer. `retry_after` is in
/// seconds and may be fractional; missing, malformed, or non-positive
/// values fall back to one second.
fn retry_delay(body: &serde_json::Value) -> Duration {
    let secs = body
        .get("retry_after")
        .and_then(|v| v.as_f64())
        .filter(|s| *s > 0.0)
        .unwrap_or(1.0);
    Duration::from_millis((secs * 1000.0) as u64) + RETRY_BUFFER
}
