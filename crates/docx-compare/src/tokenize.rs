//! C1: pure tokenization, normalization, and shingle/Jaccard primitives.
//!
//! These are the only functions the aligner (C3) and move detector (C4) use
//! to turn paragraph/run text into comparable units; nothing here knows
//! about OOXML or about the rest of the pipeline.

use std::collections::HashSet;

pub use docx_core::normalize_for_compare;

/// Which unit `tokenize_for_diff` decomposes text into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Word,
    Char,
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Split `s` into maximal runs of {word-characters | whitespace | a single
/// punctuation character}. Concatenating the returned tokens reproduces `s`
/// exactly — the run-level aligner relies on this to map opcodes back to
/// character offsets.
pub fn tokenize_preserve_spacing(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_is_word = false;
    let mut current_is_space = false;

    for ch in s.chars() {
        if ch.is_whitespace() {
            if !current_is_space && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            current.push(ch);
            current_is_space = true;
            current_is_word = false;
        } else if is_word_char(ch) {
            if !current_is_word && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            current.push(ch);
            current_is_word = true;
            current_is_space = false;
        } else {
            // Punctuation: always its own single-character token.
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.push(ch.to_string());
            current_is_word = false;
            current_is_space = false;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Tokenize at word granularity (same as [`tokenize_preserve_spacing`]) or at
/// per-character granularity.
pub fn tokenize_for_diff(s: &str, granularity: Granularity) -> Vec<String> {
    match granularity {
        Granularity::Word => tokenize_preserve_spacing(s),
        Granularity::Char => s.chars().map(|c| c.to_string()).collect(),
    }
}

/// The set of length-`k` contiguous sliding windows over `tokens`, each
/// joined by a single space. Empty when `tokens.len() < k`.
pub fn shingles(tokens: &[String], k: usize) -> HashSet<String> {
    if k == 0 || tokens.len() < k {
        return HashSet::new();
    }
    (0..=tokens.len() - k).map(|i| tokens[i..i + k].join(" ")).collect()
}

/// `|a∩b| / |a∪b|`, with `jaccard(∅,∅) = 1` and `jaccard(∅,x) = 0` for `x`
/// non-empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
