//! Text utilities: normalization, sentence segmentation, chunking,
//! line de-duplication, and a readability score.
//!
//! Each function is pure `&str -> owned` and total; empty input always
//! produces a well-defined result.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

static VOWEL_CLUSTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[aeiouyAEIOUY]+").expect("valid regex"));

/// Collapse all whitespace runs to single spaces and trim.
pub fn clean(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Split text into sentences on `[.!?]` followed by whitespace.
/// Empty segments are dropped.
pub fn segment_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let trimmed = text.trim();
    let mut last = 0;

    for m in SENTENCE_SPLIT_RE.find_iter(trimmed) {
        // Keep the terminating punctuation, drop the whitespace.
        let end = m.start() + 1;
        let sentence = trimmed[last..end].trim();
        if !sentence.is_empty() {
            out.push(sentence.to_string());
        }
        last = m.end();
    }

    let tail = trimmed[last..].trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }

    out
}

/// Greedily pack sentences into chunks not exceeding `max_chars`.
/// Always returns at least one (possibly empty) chunk. A single sentence
/// longer than `max_chars` becomes its own oversized chunk.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    let sentences = segment_sentences(text);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if current.is_empty() {
            current = sentence;
        } else if current.len() + 1 + sentence.len() <= max_chars {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = sentence;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    if chunks.is_empty() {
        chunks.push(String::new());
    }

    chunks
}

/// Preserve the first occurrence of each non-empty line, in original order;
/// drop exact-duplicate subsequent lines and blank lines.
pub fn dedupe_lines(text: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for line in text.lines() {
        let key = line.trim();
        if !key.is_empty() && seen.insert(key.to_string()) {
            out.push(line);
        }
    }

    out.join("\n")
}

/// Flesch Reading Ease score. Returns 0.0 for empty input.
///
/// Syllables are approximated as vowel-cluster matches per word (minimum 1);
/// sentence count has a minimum of 1 so single-fragment input still scores.
pub fn readability(text: &str) -> f64 {
    let cleaned = clean(text);
    if cleaned.is_empty() {
        return 0.0;
    }

    let words: Vec<&str> = WORD_RE.find_iter(&cleaned).map(|m| m.as_str()).collect();
    let word_count = words.len().max(1) as f64;
    let sentence_count = segment_sentences(&cleaned).len().max(1) as f64;
    let syllables: usize = words
        .iter()
        .map(|w| VOWEL_CLUSTER_RE.find_iter(w).count().max(1))
        .sum();

    206.835 - 1.015 * (word_count / sentence_count) - 84.6 * (syllables as f64 / word_count)
}
