//! Positional word index construction over ordered caption segments.

use crate::tokenizer::extract_words_with_position;
use crate::types::{SubtitleSegment, WordIndex, WordOccurrence};
use anyhow::{Context, Result};

/// Build a word index from an ordered segment sequence.
///
/// For each segment, positioned words are extracted and appended to their
/// word's occurrence list in scan order. Every occurrence from segment `i`
/// shares one context string: the space-join of the previous, current, and
/// next segment texts, skipping neighbors that do not exist or are empty.
pub fn build_word_index(segments: &[SubtitleSegment]) -> WordIndex {
    let mut index = WordIndex::new();

    for (segment_id, segment) in segments.iter().enumerate() {
        let words = extract_words_with_position(
            &segment.text,
            segment.start_ms,
            segment.end_ms,
            segment_id,
        );

        if words.is_empty() {
            continue;
        }

        // One context per segment, shared by all of its words.
        let context = segment_context(segments, segment_id);

        for word in words {
            index.entry(word.word).or_default().push(WordOccurrence {
                start_ms: word.start_ms,
                end_ms: word.end_ms,
                segment_id: word.segment_id,
                context: context.clone(),
            });
        }
    }

    index
}

fn segment_context(segments: &[SubtitleSegment], segment_id: usize) -> String {
    let prev = segment_id
        .checked_sub(1)
        .and_then(|id| segments.get(id))
        .map(|s| s.text.as_str());
    let next = segments.get(segment_id + 1).map(|s| s.text.as_str());

    [prev, Some(segments[segment_id].text.as_str()), next]
        .into_iter()
        .flatten()
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a word index to the flat record form persisted in `VideoCache`.
/// Occurrence-list order is preserved.
pub fn word_index_to_record(index: &WordIndex) -> serde_json::Map<String, serde_json::Value> {
    index
        .iter()
        .map(|(word, occurrences)| {
            let value = serde_json::to_value(occurrences)
                .unwrap_or_else(|_| serde_json::Value::Array(Vec::new()));
            (word.clone(), value)
        })
        .collect()
}

/// Rebuild a word index from its persisted record form.
pub fn record_to_word_index(
    record: &serde_json::Map<String, serde_json::Value>,
) -> Result<WordIndex> {
    let mut index = WordIndex::new();

    for (word, value) in record {
        let occurrences: Vec<WordOccurrence> = serde_json::from_value(value.clone())
            .with_context(|| format!("invalid occurrence list for word '{}'", word))?;
        index.insert(word.clone(), occurrences);
    }

    Ok(index)
}
