//! Text normalization and word extraction for caption segments.

use crate::types::PositionedWord;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Closed set of common English function words excluded from indexing.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
        "of", "with", "by", "from", "as", "is", "are", "was", "were", "be",
        "been", "being", "have", "has", "had", "do", "does", "did", "will",
        "would", "should", "could", "may", "might", "must", "can", "this",
        "that", "these", "those", "i", "you", "he", "she", "it", "we", "they",
        "me", "him", "her", "us", "them", "my", "your", "his", "its", "our",
        "their", "what", "which", "who", "whom", "whose", "where", "when",
        "why", "how", "all", "each", "every", "both", "few", "more", "most",
        "other", "some", "such", "no", "nor", "not", "only", "own", "same",
        "so", "than", "too", "very", "just", "now",
    ])
});

/// Check whether a normalized word is in the stop-word list.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Normalize a raw token: lowercase and strip every character that is not
/// an ASCII letter, digit, or underscore. Accented letters are stripped
/// with the punctuation; pure punctuation normalizes to an empty string.
pub fn normalize_word(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Tokenize text into normalized words, dropping empties and stop words.
/// Output order matches input order; duplicates are retained.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|word| !word.is_empty() && !is_stop_word(word))
        .collect()
}

/// Extract normalized words from a segment's text with per-word timing.
///
/// Each raw whitespace token is assigned an equal slice of the segment's
/// duration, computed against the RAW token count before any filtering, so
/// words removed as stop words still consume their slice of the division.
/// This is a coarse approximation of per-word timing absent forced
/// alignment.
pub fn extract_words_with_position(
    text: &str,
    start_ms: i64,
    end_ms: i64,
    segment_id: usize,
) -> Vec<PositionedWord> {
    let raw_tokens: Vec<&str> = text.split_whitespace().collect();
    if raw_tokens.is_empty() {
        return Vec::new();
    }

    let duration = end_ms - start_ms;
    let slice = duration / raw_tokens.len() as i64;

    raw_tokens
        .iter()
        .enumerate()
        .map(|(index, token)| PositionedWord {
            word: normalize_word(token),
            start_ms: start_ms + index as i64 * slice,
            end_ms: start_ms + (index as i64 + 1) * slice,
            segment_id,
        })
        .filter(|item| !item.word.is_empty() && !is_stop_word(&item.word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_word_lowercases_and_strips_punctuation() {
        assert_eq!(normalize_word("Hello!"), "hello");
        assert_eq!(normalize_word("don't"), "dont");
        assert_eq!(normalize_word("Out_put2"), "out_put2");
    }

    #[test]
    fn test_normalize_word_strips_non_ascii_letters() {
        assert_eq!(normalize_word("café"), "caf");
        assert_eq!(normalize_word("naïve"), "nave");
        assert_eq!(normalize_word("日本語"), "");
    }

    #[test]
    fn test_normalize_word_pure_punctuation_is_empty() {
        assert_eq!(normalize_word("..."), "");
        assert_eq!(normalize_word("—"), "");
    }

    #[test]
    fn test_tokenize_drops_stop_words_and_empties() {
        let words = tokenize("The cat... sat! on THE mat");
        assert_eq!(words, vec!["cat", "sat", "mat"]);
    }

    #[test]
    fn test_tokenize_never_yields_empty_or_stop_words() {
        let inputs = [
            "the a an and",
            "  ...  ?!  ",
            "Mixing CASE and, punctuation; everywhere!",
            "",
        ];

        for text in inputs {
            for word in tokenize(text) {
                assert!(!word.is_empty());
                assert!(!is_stop_word(&word), "stop word leaked: {}", word);
            }
        }
    }

    #[test]
    fn test_tokenize_retains_duplicates_and_order() {
        let words = tokenize("good morning good night");
        assert_eq!(words, vec!["good", "morning", "good", "night"]);
    }

    #[test]
    fn test_extract_words_slices_against_raw_token_count() {
        // Three raw tokens split [0, 1000) into equal 333ms slices; "the" is
        // filtered but still consumed its slice.
        let words = extract_words_with_position("the cat sat", 0, 1000, 0);

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "cat");
        assert_eq!(words[0].start_ms, 333);
        assert_eq!(words[0].end_ms, 666);
        assert_eq!(words[1].word, "sat");
        assert_eq!(words[1].start_ms, 666);
        assert_eq!(words[1].end_ms, 999);
        assert!(words.iter().all(|w| w.segment_id == 0));
    }

    #[test]
    fn test_extract_words_empty_text_has_no_division_by_zero() {
        assert!(extract_words_with_position("", 0, 1000, 3).is_empty());
        assert!(extract_words_with_position("   ", 0, 1000, 3).is_empty());
    }
}
