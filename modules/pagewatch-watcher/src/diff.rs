//! Novelty detection between two normalized item sequences. Reordering is
//! not change: an item counts as novel only when nothing in the previous
//! sequence matches it exactly or fuzzily.

use std::collections::HashSet;

/// Items scoring above this against any previous item are near-duplicates,
/// not novel. Tunable; the word-set heuristic is a speed/precision trade.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Words at or below this length carry too little signal to compare on.
pub const MIN_WORD_LEN: usize = 3;

/// Items from `new` that are genuinely novel against `prev`, in `new`'s
/// order. An empty `prev` means there is no baseline yet; the first
/// observation only establishes one, so nothing is novel.
pub fn find_new_items(prev: &[String], new: &[String]) -> Vec<String> {
    if prev.is_empty() {
        return Vec::new();
    }

    let prev_lower: Vec<String> = prev.iter().map(|s| s.to_lowercase()).collect();
    let prev_set: HashSet<&str> = prev_lower.iter().map(String::as_str).collect();

    new.iter()
        .filter(|item| {
            let lowered = item.to_lowercase();
            if prev_set.contains(lowered.as_str()) {
                return false;
            }
            !prev_lower
                .iter()
                .any(|old| similarity(&lowered, old) > SIMILARITY_THRESHOLD)
        })
        .cloned()
        .collect()
}

/// Word-set similarity in [0, 1]. Not an edit distance: the score is the
/// share of long words the two strings have in common, over the larger
/// word set. Strings whose lengths diverge by more than 2x score 0 outright.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (shorter, longer) = if a.chars().count() > b.chars().count() {
        (b, a)
    } else {
        (a, b)
    };
    if longer.chars().count() > shorter.chars().count() * 2 {
        return 0.0;
    }

    let words_short: HashSet<&str> = significant_words(shorter);
    let words_long: HashSet<&str> = significant_words(longer);
    if words_short.is_empty() {
        return 0.0;
    }

    let matches = words_short.intersection(&words_long).count();
    matches as f64 / words_short.len().max(words_long.len()) as f64
}

fn significant_words(s: &str) -> HashSet<&str> {
    s.split_whitespace()
        .filter(|w| w.chars().count() > MIN_WORD_LEN)
        .collect()
}
