//! Shallow lexical features per turn.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::tokenizer::tokenize;

static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(no|not|never|can't|cannot|won't|doesn't|isn't)\b").unwrap()
});

/// Bigram counts below this yield a zero repetition score.
const MIN_BIGRAMS: usize = 6;

/// Fixed lexical feature vector of one turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Word count.
    pub len: usize,
    /// Bigram repetition ratio in [0, 1].
    pub rep: f64,
    /// Exclamation marks.
    pub ex: usize,
    /// Question marks.
    pub q: usize,
    /// Negation words.
    pub neg: usize,
    /// Mean word length in characters.
    pub avg_word: f64,
    /// Uppercase share of alphabetic ASCII letters.
    pub upper_ratio: f64,
}

/// Compute the feature vector of a turn's text. Pure; empty text yields zeros.
pub fn features_for_turn(text: &str) -> FeatureVector {
    let lower = text.to_lowercase();
    let words = tokenize(text);
    let len = words.len();

    let bigrams: Vec<(&str, &str)> = words
        .windows(2)
        .map(|w| (w[0].as_str(), w[1].as_str()))
        .collect();
    let rep = repetition_score(&bigrams);

    let ex = lower.matches('!').count();
    let q = lower.matches('?').count();
    let neg = NEGATION.find_iter(&lower).count();

    let avg_word = if len > 0 {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / len as f64
    } else {
        0.0
    };

    let upper = text.chars().filter(|c| c.is_ascii_uppercase()).count();
    let alpha = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let upper_ratio = if alpha > 0 {
        upper as f64 / alpha as f64
    } else {
        0.0
    };

    FeatureVector {
        len,
        rep,
        ex,
        q,
        neg,
        avg_word,
        upper_ratio,
    }
}

/// Repetition over a sequence: `min(1, Σ(count-1) / total)` over items seen
/// more than once, or 0 when fewer than six items exist.
pub fn repetition_score<T: Eq + std::hash::Hash>(items: &[T]) -> f64 {
    if items.len() < MIN_BIGRAMS {
        return 0.0;
    }
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    let repeats: usize = counts.values().filter(|&&c| c > 1).map(|c| c - 1).sum();
    (repeats as f64 / items.len() as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_empty_text_all_zero() {
        assert_eq!(features_for_turn(""), FeatureVector::default());
        assert_eq!(features_for_turn("  !?  ").len, 0);
    }

    #[test]
    fn test_counts_punctuation_and_negation() {
        let f = features_for_turn("No! I can't and won't. Why not? Never?");
        assert_eq!(f.ex, 1);
        assert_eq!(f.q, 2);
        assert_eq!(f.neg, 5);
    }

    #[test]
    fn test_negation_needs_word_boundary() {
        let f = features_for_turn("nothing knows notable nowhere");
        assert_eq!(f.neg, 0);
    }

    #[test]
    fn test_avg_word_and_len() {
        let f = features_for_turn("ab abcd");
        assert_eq!(f.len, 2);
        assert_abs_diff_eq!(f.avg_word, 3.0);
    }

    #[test]
    fn test_upper_ratio() {
        let f = features_for_turn("ABcd 12");
        assert_abs_diff_eq!(f.upper_ratio, 0.5);
        assert_eq!(features_for_turn("123 !!").upper_ratio, 0.0);
    }

    #[test]
    fn test_repetition_needs_six_bigrams() {
        // 5 bigrams, all identical
        let f = features_for_turn("go go go go go go");
        assert_eq!(f.rep, 0.0);
        // 6 identical bigrams → 5 repeats / 6
        let f = features_for_turn("go go go go go go go");
        assert_abs_diff_eq!(f.rep, 5.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_repetition_distinct_bigrams_zero() {
        let f = features_for_turn("one two three four five six seven eight");
        assert_eq!(f.rep, 0.0);
    }

    #[test]
    fn test_repetition_score_counts_each_extra() {
        let items = ["a", "b", "a", "b", "a", "c"];
        // a: 3 → 2 repeats, b: 2 → 1 repeat
        assert_abs_diff_eq!(repetition_score(&items), 3.0 / 6.0);
    }

    #[test]
    fn test_deterministic() {
        let text = "Repeatable INPUT, repeatable output? Yes!";
        assert_eq!(features_for_turn(text), features_for_turn(text));
    }
}
