use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::constants::{MIN_KEYWORD_LEN, STOP_WORDS};

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9']+").unwrap());
static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Tokenize text into lowercase ASCII word runs.
/// Apostrophes are kept anywhere in a run ("don't", "'tis").
/// No stemming; stop words survive here and are filtered by [`keywords`].
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_SET.contains(word)
}

/// A token qualifies as a keyword when it is long enough and not a stop word.
pub fn is_keyword(word: &str) -> bool {
    word.chars().count() >= MIN_KEYWORD_LEN && !is_stop_word(word)
}

/// Keyword tokens of `text`, in order of appearance, duplicates kept.
pub fn keywords(text: &str) -> Vec<String> {
    tokenize(text).into_iter().filter(|w| is_keyword(w)).collect()
}

/// Distinct keywords of `text`.
pub fn keyword_set(text: &str) -> HashSet<String> {
    keywords(text).into_iter().collect()
}
