use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of alerted content hashes persisted per monitor.
pub const ALERT_HISTORY_LIMIT: usize = 100;

/// Floor for polling intervals. Anything shorter is clamped up.
pub const MIN_INTERVAL_SECS: u64 = 30;

/// How an extraction rule reads the matched elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractKind {
    /// Element text content.
    #[default]
    Text,
    /// Inner HTML of the element.
    Html,
    /// A named attribute value.
    Attr,
}

/// A single CSS-selector extraction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    pub selector: String,
    #[serde(default)]
    pub kind: ExtractKind,
    /// Attribute name, used only when `kind` is `Attr`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl SelectorRule {
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            kind: ExtractKind::Text,
            attribute: None,
        }
    }
}

/// A monitored page: identity, fetch/extract settings, delivery settings,
/// and the runtime state the checker writes back after each pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub rules: Vec<SelectorRule>,
    pub interval_secs: u64,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default = "default_true")]
    pub popup_enabled: bool,
    #[serde(default = "default_true")]
    pub audio_enabled: bool,

    // Fields below are owned by the checker; nothing else writes them.
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_change: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_content: String,
    #[serde(default)]
    pub alert_history: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Monitor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            rules: Vec::new(),
            interval_secs: 300,
            enabled: true,
            webhook_url: None,
            popup_enabled: true,
            audio_enabled: true,
            last_check: None,
            last_change: None,
            last_content: String::new(),
            alert_history: Vec::new(),
        }
    }

    /// Polling interval with the minimum floor applied.
    pub fn effective_interval_secs(&self) -> u64 {
        self.interval_secs.max(MIN_INTERVAL_SECS)
    }
}
