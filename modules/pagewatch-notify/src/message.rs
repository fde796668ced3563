use std::sync::LazyLock;

use regex::Regex;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Webhook messages shorter than this after cleanup are not worth sending.
pub const MIN_MESSAGE_LEN: usize = 5;

/// Novel-item text is truncated to this many characters in the payload.
pub const MAX_CHANGE_TEXT_LEN: usize = 300;

/// Local alert bodies are truncated to this many characters.
pub const MAX_PREVIEW_LEN: usize = 100;

/// Compose the webhook message body for a change, or `None` when the
/// cleaned-up change text is too short to be meaningful.
pub fn compose(monitor_name: &str, url: &str, new_items_text: &str) -> Option<String> {
    let mut text = collapse_whitespace(&decode_entities(new_items_text));

    if text.chars().count() < MIN_MESSAGE_LEN {
        return None;
    }

    if text.chars().count() > MAX_CHANGE_TEXT_LEN {
        text = text.chars().take(MAX_CHANGE_TEXT_LEN).collect::<String>() + "...";
    }

    Some(format!(
        "**{monitor_name} was updated** | <{url}>\n\n> {text}"
    ))
}

/// Short whitespace-collapsed preview for the local alert body.
pub fn preview(content: &str) -> String {
    let collapsed = collapse_whitespace(content);
    collapsed.chars().take(MAX_PREVIEW_LEN).collect()
}

pub fn collapse_whitespace(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// Decode the handful of HTML entities that survive text extraction.
/// `&amp;` goes first so double-encoded input collapses the same way the
/// original monitor did.
pub fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_name_url_and_text() {
        let msg = compose("Deals", "https://example.com/deals", "Big new offer today").unwrap();
        assert_eq!(
            msg,
            "**Deals was updated** | <https://example.com/deals>\n\n> Big new offer today"
        );
    }

    #[test]
    fn skips_short_or_empty_text() {
        assert!(compose("Deals", "https://example.com", "").is_none());
        assert!(compose("Deals", "https://example.com", "  ab  ").is_none());
        assert!(compose("Deals", "https://example.com", "abcde").is_some());
    }

    #[test]
    fn truncates_long_text_with_ellipsis() {
        let long = "word ".repeat(100);
        let msg = compose("Deals", "https://example.com", &long).unwrap();
        let body = msg.split("> ").nth(1).unwrap();
        assert_eq!(body.chars().count(), MAX_CHANGE_TEXT_LEN + 3);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn decodes_entities_and_collapses_whitespace() {
        let msg = compose("Shop", "https://example.com", "Tom &amp; Jerry   &lt;live&gt;").unwrap();
        assert!(msg.contains("Tom & Jerry <live>"));
    }

    #[test]
    fn preview_collapses_and_caps() {
        let p = preview("line one\n\n   line two");
        assert_eq!(p, "line one line two");
        let p = preview(&"x".repeat(500));
        assert_eq!(p.chars().count(), MAX_PREVIEW_LEN);
    }
}
