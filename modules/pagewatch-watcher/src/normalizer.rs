//! Turns raw extracted text into an ordered sequence of comparable items.
//! Lines shorter than the minimum are noise; time-of-day tokens and
//! advertisement markers change between fetches without the content itself
//! changing, so they are stripped before comparison.

use std::sync::LazyLock;

use regex::Regex;

/// Lines at or below this length (after trimming/stripping) are discarded.
pub const MIN_ITEM_LEN: usize = 10;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\s*(AM|PM|am|pm)?\b").expect("valid regex"));
static AD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(Advertisement|Sponsored|Ad)\b").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Split content into normalized items, in source order. May be empty.
pub fn normalize_content(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_ITEM_LEN)
        .map(|line| {
            let line = TIME_RE.replace_all(line, "");
            let line = AD_RE.replace_all(&line, "");
            WS_RE.replace_all(&line, " ").trim().to_string()
        })
        .filter(|line| line.chars().count() > MIN_ITEM_LEN)
        .collect()
}

/// Canonical form used for hashing and dedup identity: lower-cased,
/// whitespace-collapsed, trimmed.
pub fn canonical(item: &str) -> String {
    WS_RE
        .replace_all(&item.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// Deterministic 32-bit content hash of an item's canonical form, as a
/// decimal string. Same recurrence (`h = h*31 + code` in shifted form, over
/// UTF-16 code units, wrapping at i32) as the persisted histories this
/// store format inherits, so old alert histories keep matching.
pub fn content_hash(item: &str) -> String {
    let normalized = canonical(item);
    if normalized.is_empty() {
        return "0".to_string();
    }
    let mut hash: i32 = 0;
    for unit in normalized.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(unit as i32);
    }
    hash.to_string()
}
