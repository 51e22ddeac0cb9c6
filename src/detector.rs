//! Unknown-word detection against a user vocabulary snapshot.

use crate::types::{UnknownWordStats, WordIndex};
use std::collections::HashSet;

/// Produce ranked statistics for every indexed word absent from `known`.
///
/// Lookup is exact-match on the already-lowercased index keys; known words
/// are fully excluded. Results are sorted by count descending; ties keep
/// the index's iteration order (`sort_by` is stable).
pub fn detect_unknown_words(index: &WordIndex, known: &HashSet<String>) -> Vec<UnknownWordStats> {
    let mut stats: Vec<UnknownWordStats> = index
        .iter()
        .filter(|(word, _)| !known.contains(*word))
        .map(|(word, occurrences)| UnknownWordStats {
            word: word.clone(),
            count: occurrences.len(),
            first_occurrence: occurrences
                .iter()
                .map(|o| o.start_ms)
                .min()
                .unwrap_or_default(),
            sample_context: occurrences
                .first()
                .map(|o| o.context.clone())
                .unwrap_or_default(),
        })
        .collect();

    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::build_word_index;
    use crate::types::{SubtitleSegment, WordOccurrence};

    fn segment(start_ms: i64, end_ms: i64, text: &str) -> SubtitleSegment {
        SubtitleSegment {
            start_ms,
            end_ms,
            text: text.to_string(),
        }
    }

    fn known(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_single_segment_ranking_keeps_index_order_on_ties() {
        // Scenario A: both unknown words have count 1, so their order is the
        // index's iteration order.
        let segments = vec![segment(0, 1000, "the cat sat")];
        let index = build_word_index(&segments);

        let stats = detect_unknown_words(&index, &known(&[]));
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].word, "cat");
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[0].first_occurrence, 333);
        assert_eq!(stats[0].sample_context, "the cat sat");
        assert_eq!(stats[1].word, "sat");
        assert_eq!(stats[1].count, 1);
    }

    #[test]
    fn test_higher_count_ranks_first() {
        // Scenario B: "good" appears twice and outranks the singletons.
        let segments = vec![
            segment(0, 1000, "good morning"),
            segment(1000, 2000, "good night"),
        ];
        let index = build_word_index(&segments);

        let stats = detect_unknown_words(&index, &known(&[]));
        assert_eq!(stats[0].word, "good");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].first_occurrence, 0);

        let rest: Vec<&str> = stats[1..].iter().map(|s| s.word.as_str()).collect();
        assert_eq!(rest, vec!["morning", "night"]);
    }

    #[test]
    fn test_known_words_are_fully_excluded() {
        // Scenario C.
        let segments = vec![segment(0, 1000, "the cat sat")];
        let index = build_word_index(&segments);

        let stats = detect_unknown_words(&index, &known(&["cat"]));
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].word, "sat");
    }

    #[test]
    fn test_every_unknown_word_appears_exactly_once_with_its_count() {
        let segments = vec![
            segment(0, 1000, "alpha beta alpha"),
            segment(1000, 2000, "beta gamma alpha"),
        ];
        let index = build_word_index(&segments);
        let knowns = known(&["gamma"]);

        let stats = detect_unknown_words(&index, &knowns);
        for (word, occurrences) in &index {
            let matches: Vec<_> = stats.iter().filter(|s| &s.word == word).collect();
            if knowns.contains(word) {
                assert!(matches.is_empty());
            } else {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].count, occurrences.len());
            }
        }
    }

    #[test]
    fn test_sorted_descending_by_count() {
        let segments = vec![
            segment(0, 1000, "red red red"),
            segment(1000, 2000, "blue blue green"),
        ];
        let index = build_word_index(&segments);

        let stats = detect_unknown_words(&index, &known(&[]));
        for pair in stats.windows(2) {
            assert!(pair[0].count >= pair[1].count);
        }
    }

    #[test]
    fn test_sample_context_is_first_insertion_not_earliest_time() {
        // Hand-built index whose first-inserted occurrence starts later in
        // time than a subsequent one.
        let mut index = WordIndex::new();
        index.insert(
            "drift".to_string(),
            vec![
                WordOccurrence {
                    start_ms: 5000,
                    end_ms: 5400,
                    segment_id: 4,
                    context: "later in time, first in order".to_string(),
                },
                WordOccurrence {
                    start_ms: 100,
                    end_ms: 400,
                    segment_id: 0,
                    context: "earlier in time".to_string(),
                },
            ],
        );

        let stats = detect_unknown_words(&index, &known(&[]));
        assert_eq!(stats[0].first_occurrence, 100);
        assert_eq!(stats[0].sample_context, "later in time, first in order");
    }
}
