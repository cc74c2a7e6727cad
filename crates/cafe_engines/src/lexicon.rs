#![forbid(unsafe_code)]

//! Keyword/phrase membership tests shared by the language, sentiment, topic
//! and intent engines. Matching is case-insensitive substring membership over
//! NFKD-folded text with combining marks removed, so "pésimo", "pe\u{301}simo"
//! and "pesimo" all compare equal.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Number of `words` entries found in `text`. Each entry counts once.
pub fn score(text: &str, words: &[&str]) -> usize {
    score_normalized(&normalize(text), words)
}

/// `score` for text already passed through [`normalize`].
pub fn score_normalized(normalized: &str, words: &[&str]) -> usize {
    words
        .iter()
        .map(|w| normalize(w))
        .filter(|w| !w.trim().is_empty() && normalized.contains(w.as_str()))
        .count()
}

pub fn contains_any(text: &str, words: &[&str]) -> bool {
    score(text, words) > 0
}

/// Label of the highest-scoring table. Ties go to the table declared first;
/// `None` when nothing matched at all.
pub fn best_scoring<K: Copy>(text: &str, tables: &[(K, &[&str])]) -> Option<(K, usize)> {
    let normalized = normalize(text);
    let mut best: Option<(K, usize)> = None;
    for (label, words) in tables {
        let s = score_normalized(&normalized, words);
        if s > best.map(|(_, b)| b).unwrap_or(0) {
            best = Some((*label, s));
        }
    }
    best
}

/// Whole-token membership (token boundaries are non-alphanumeric chars).
pub fn contains_token(text: &str, token: &str) -> bool {
    let token = normalize(token);
    if token.is_empty() {
        return false;
    }
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .any(|t| t == token)
}

/// First entry (in declaration order) found in the text.
pub fn first_match<'a>(text: &str, words: &[&'a str]) -> Option<&'a str> {
    let normalized = normalize(text);
    words
        .iter()
        .copied()
        .find(|w| {
            let w = normalize(w);
            !w.trim().is_empty() && normalized.contains(w.as_str())
        })
}
