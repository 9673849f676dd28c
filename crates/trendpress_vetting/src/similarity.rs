//! Token-level text similarity shared by the duplicate guard and link finder.

use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this (in chars) carry no signal.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Lower-cased, alphanumeric-only form of `text` for exact comparisons.
///
/// Whitespace and punctuation are dropped entirely, so "정부 지원금!" and
/// "정부지원금" normalize to the same string.
pub fn normalize(text: &str) -> String {
    text.nfc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Whitespace-split, lower-cased tokens stripped of non-alphanumerics.
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let composed: String = text.nfc().collect();
    composed
        .split_whitespace()
        .map(|raw| {
            raw.chars()
                .flat_map(char::to_lowercase)
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .collect()
}

/// Shared tokens divided by the size of the smaller set.
///
/// A short phrase wholly contained in a longer text scores 1.0, which biases
/// the guard toward catching subset-phrased duplicates.
pub fn overlap_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let shared = small.iter().filter(|t| large.contains(*t)).count();
    shared as f64 / small.len() as f64
}

/// Convenience wrapper tokenizing both sides.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    overlap_similarity(&tokenize(a), &tokenize(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_strips_space_and_punctuation() {
        assert_eq!(normalize("정부 지원금, 신청방법!"), "정부지원금신청방법");
        assert_eq!(normalize("  Rust-Lang 2026 "), "rustlang2026");
    }

    #[test]
    fn tokenize_drops_short_tokens_by_char_count() {
        let tokens = tokenize("A 청 청년 (월세) is GOOD!!");
        assert_eq!(tokens, set(&["청년", "월세", "is", "good"]));
    }

    #[test]
    fn tokenize_composes_decomposed_hangul() {
        // "한글" written as conjoining jamo
        let decomposed = "\u{1112}\u{1161}\u{11AB}\u{1100}\u{1173}\u{11AF}";
        assert_eq!(tokenize(decomposed), set(&["한글"]));
    }

    #[test]
    fn overlap_is_bounded() {
        let a = set(&["rust", "async", "tokio"]);
        let b = set(&["rust", "serde"]);
        let s = overlap_similarity(&a, &b);
        assert!((0.0..=1.0).contains(&s));
        assert_eq!(s, 0.5);
    }

    #[test]
    fn overlap_with_self_is_one() {
        let a = set(&["청년", "월세", "지원"]);
        assert_eq!(overlap_similarity(&a, &a), 1.0);
    }

    #[test]
    fn overlap_with_empty_is_zero() {
        let a = set(&["청년"]);
        let empty = BTreeSet::new();
        assert_eq!(overlap_similarity(&empty, &a), 0.0);
        assert_eq!(overlap_similarity(&a, &empty), 0.0);
        assert_eq!(overlap_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn subset_phrase_scores_full_match() {
        let s = text_similarity("청년 월세", "2026 청년 월세 지원 신청 총정리");
        assert_eq!(s, 1.0);
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = set(&["a1", "b2", "c3"]);
        let b = set(&["b2", "d4"]);
        assert_eq!(overlap_similarity(&a, &b), overlap_similarity(&b, &a));
    }
}
