//! Page fetching. Network errors, non-success statuses, and timeouts all
//! fold into "no content", so a bad fetch is indistinguishable from an
//! empty page and the check silently retries next cycle.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::prelude::IndexedRandom;
use tracing::{debug, warn};

use pagewatch_common::PagewatchError;

/// Modern browser user agents, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page body. Empty string means "no content this cycle";
    /// `Err` is reserved for unusable input such as a non-http URL.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(PagewatchError::Fetch(format!(
                "only http/https URLs are allowed, got {}",
                parsed.scheme()
            ))
            .into());
        }

        let user_agent = *USER_AGENTS
            .choose(&mut rand::rng())
            .expect("non-empty user agent pool");

        let response = self
            .client
            .get(url)
            .header("User-Agent", user_agent)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(url, error = %e, "Fetch failed");
                return Ok(String::new());
            }
        };

        if !response.status().is_success() {
            warn!(url, status = %response.status(), "Fetch returned non-success status");
            return Ok(String::new());
        }

        match response.text().await {
            Ok(body) => {
                debug!(url, bytes = body.len(), "Fetched page");
                Ok(body)
            }
            Err(e) => {
                warn!(url, error = %e, "Failed to read response body");
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let fetcher = HttpFetcher::new(10).unwrap();
        assert!(fetcher.fetch("file:///etc/passwd").await.is_err());
        assert!(fetcher.fetch("not a url").await.is_err());
    }

    #[tokio::test]
    async fn connection_failure_folds_to_empty() {
        let fetcher = HttpFetcher::new(1).unwrap();
        // Port 9 (discard) refuses connections on localhost.
        let body = fetcher.fetch("http://127.0.0.1:9/page").await.unwrap();
        assert!(body.is_empty());
    }
}
