use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One observed caption utterance. Segments are immutable once created and
/// ordered by arrival within a video; the indexer relies on segment
/// adjacency for context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleSegment {
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
}

/// One instance of a word's appearance, with its approximate time slice and
/// the surrounding-segment context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordOccurrence {
    pub start_ms: i64,
    pub end_ms: i64,
    /// Index into the segment sequence the index was built from.
    pub segment_id: usize,
    pub context: String,
}

/// A normalized word carrying its equal-share time slice, as produced by
/// `tokenizer::extract_words_with_position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedWord {
    pub word: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub segment_id: usize,
}

/// Mapping from normalized word to its occurrences in segment scan order.
///
/// Occurrence lists are insertion-ordered; map key order carries no meaning
/// beyond giving the detector a deterministic iteration order.
pub type WordIndex = BTreeMap<String, Vec<WordOccurrence>>;

/// Ranked statistics for one word absent from the known set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownWordStats {
    pub word: String,
    /// Number of occurrences, always >= 1 (the indexer never creates empty
    /// occurrence lists).
    pub count: usize,
    /// Minimum start_ms across all occurrences.
    pub first_occurrence: i64,
    /// Context of the first occurrence in insertion order.
    pub sample_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationExample {
    pub original: String,
    pub paraphrase: String,
}

/// Annotation service result for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordAnnotation {
    pub translation: String,
    pub meaning: String,
    pub ipa: String,
    pub pronunciation_tips: String,
    pub example: AnnotationExample,
}

/// Persisted per-video aggregate, keyed by `video_<id>` in the store and
/// fully replaced on each successful index rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCache {
    pub video_id: String,
    pub segments: Vec<SubtitleSegment>,
    /// Record form of the word index (see `indexer::word_index_to_record`).
    pub word_index: serde_json::Map<String, serde_json::Value>,
    pub unknown_stats: Vec<UnknownWordStats>,
    pub annotations: HashMap<String, WordAnnotation>,
    /// Epoch milliseconds of the rebuild that produced this cache.
    pub timestamp: i64,
}

impl VideoCache {
    /// Store key for a video's cache.
    pub fn store_key(video_id: &str) -> String {
        format!("video_{}", video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_serializes_with_camel_case_keys() {
        let segment = SubtitleSegment {
            start_ms: 0,
            end_ms: 1000,
            text: "the cat sat".to_string(),
        };

        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["startMs"], 0);
        assert_eq!(json["endMs"], 1000);
        assert_eq!(json["text"], "the cat sat");
    }

    #[test]
    fn test_video_cache_store_key() {
        assert_eq!(VideoCache::store_key("abc123"), "video_abc123");
    }

    #[test]
    fn test_word_annotation_round_trip() {
        let annotation = WordAnnotation {
            translation: "猫".to_string(),
            meaning: "A small domesticated feline".to_string(),
            ipa: "/kæt/".to_string(),
            pronunciation_tips: "short vowel".to_string(),
            example: AnnotationExample {
                original: "The cat sat".to_string(),
                paraphrase: "A cat was sitting".to_string(),
            },
        };

        let json = serde_json::to_string(&annotation).unwrap();
        let parsed: WordAnnotation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, annotation);
    }
}
