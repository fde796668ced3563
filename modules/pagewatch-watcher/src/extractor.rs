//! Content extraction from fetched HTML. Selector rules drive the primary
//! path; anything that goes wrong degrades to a plain tag-stripping pass
//! rather than failing the check.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use pagewatch_common::{ExtractKind, SelectorRule};

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static ATTR_SEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static PSEUDO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":nth-child\([^)]*\)|:first-child|:last-child").expect("valid regex")
});

pub trait ContentExtractor: Send + Sync {
    /// Extract text from `html` according to `rules`. An `Err` or an empty
    /// result makes the caller fall back to [`strip_tags`].
    fn extract(&self, html: &str, rules: &[SelectorRule]) -> Result<String>;
}

/// CSS-selector extraction backed by a real HTML parser.
pub struct SelectorExtractor;

impl ContentExtractor for SelectorExtractor {
    fn extract(&self, html: &str, rules: &[SelectorRule]) -> Result<String> {
        let document = Html::parse_document(html);
        let mut parts = Vec::new();

        for rule in rules {
            let matched = apply_rule(&document, rule, &rule.selector);
            if !matched.is_empty() {
                parts.extend(matched);
                continue;
            }
            // Overly specific selectors often stop matching after minor
            // markup changes; retry with a simplified form before giving up.
            let simplified = simplify_selector(&rule.selector);
            if simplified != rule.selector {
                debug!(
                    selector = rule.selector,
                    simplified, "Selector matched nothing, retrying simplified"
                );
                parts.extend(apply_rule(&document, rule, &simplified));
            }
        }

        Ok(parts.join("\n"))
    }
}

fn apply_rule(document: &Html, rule: &SelectorRule, selector: &str) -> Vec<String> {
    let Ok(parsed) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&parsed)
        .filter_map(|el| {
            let content = match (rule.kind, rule.attribute.as_deref()) {
                (ExtractKind::Html, _) => el.inner_html(),
                (ExtractKind::Attr, Some(attr)) => {
                    el.value().attr(attr).unwrap_or_default().to_string()
                }
                // Attr without an attribute name degrades to text.
                _ => el.text().collect::<String>().trim().to_string(),
            };
            (!content.is_empty()).then_some(content)
        })
        .collect()
}

/// Strip attribute selectors and structural pseudo-classes, keeping the last
/// two simple segments. `div.list > li.item:nth-child(2)` → `div.list li.item`.
fn simplify_selector(selector: &str) -> String {
    let simplified = ATTR_SEL_RE.replace_all(selector, "");
    let simplified = PSEUDO_RE.replace_all(&simplified, "");

    let parts: Vec<&str> = simplified
        .split(['>', ' '])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let tail = parts.iter().rev().take(2).rev().cloned().collect::<Vec<_>>();
    if tail.is_empty() {
        selector.to_string()
    } else {
        tail.join(" ")
    }
}

/// Best-effort fallback: drop script/style blocks, then every tag, then
/// collapse whitespace. Used when no rules are configured or selector
/// extraction produced nothing.
pub fn strip_tags(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, "");
    let without_styles = STYLE_RE.replace_all(&without_scripts, "");
    let text = TAG_RE.replace_all(&without_styles, " ");
    WS_RE.replace_all(&text, " ").trim().to_string()
}
