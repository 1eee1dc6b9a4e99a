//! Word counting, word-limit truncation, and markdown marker stripping.

use std::sync::LazyLock;

use regex::Regex;

/// The default number of tokens a message or reply may carry.
pub const DEFAULT_WORD_LIMIT: usize = 300;

/// Appended to text that was cut at the word limit.
pub const TRUNCATION_MARKER: &str = "...";

const FORMATTING_MARKERS: [char; 4] = ['#', '*', '_', '`'];

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

static WORD_OR_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b|\S").expect("valid regex"));

/// Counts maximal runs of word characters in `text`.
pub fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Cut `text` down to at most `limit` tokens.
///
/// A token is a run of word characters or a single non-space symbol.  Text with no more than
/// `limit` tokens comes back untouched.  Longer text is rebuilt from its first `limit` tokens
/// joined by single spaces, followed by [`TRUNCATION_MARKER`].
pub fn truncate_to_word_limit(text: &str, limit: usize) -> String {
    let tokens = WORD_OR_SYMBOL
        .find_iter(text)
        .map(|m| m.as_str())
        .collect::<Vec<_>>();
    if tokens.len() <= limit {
        return text.to_string();
    }
    let mut truncated = tokens[..limit].join(" ");
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Removes `#`, `*`, `_`, and backticks, leaving every other character in place.
pub fn strip_formatting_markers(text: &str) -> String {
    text.replace(FORMATTING_MARKERS, "")
}
