//! Sublex: subtitle word indexing and unknown-word detection.
//!
//! Caption segments flow in per video, accumulate in a buffer, and are
//! flushed in batches (count threshold or debounce timer). Each flush
//! tokenizes the batch, builds a positional word index with surrounding
//! context, ranks the words absent from the user's known-word set, merges
//! optional annotations from an external service, and persists the result
//! as a whole-object per-video cache.

pub mod annotator;
pub mod buffer;
pub mod cli;
pub mod detector;
pub mod engine;
pub mod indexer;
pub mod known_words;
pub mod settings;
pub mod srt;
pub mod store;
pub mod tokenizer;
pub mod types;

pub use engine::{Engine, EngineHandle};
pub use types::{SubtitleSegment, UnknownWordStats, VideoCache, WordIndex};
