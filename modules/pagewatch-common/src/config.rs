use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
/// Everything has a sensible default; nothing is required.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the JSON monitor store.
    pub store_path: PathBuf,
    /// Page fetch timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Minimum spacing between webhook deliveries to one endpoint, in milliseconds.
    pub webhook_min_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            store_path: env::var("PAGEWATCH_STORE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("pagewatch.json")),
            fetch_timeout_secs: parsed_env("PAGEWATCH_FETCH_TIMEOUT_SECS", 10),
            webhook_min_interval_ms: parsed_env("PAGEWATCH_WEBHOOK_MIN_INTERVAL_MS", 500),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("pagewatch.json"),
            fetch_timeout_secs: 10,
            webhook_min_interval_ms: 500,
        }
    }
}

fn parsed_env(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {v:?}")),
        Err(_) => default,
    }
}
