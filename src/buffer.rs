//! Per-video segment buffering.
//!
//! Pure state machine for the flush scheduler: it decides when a batch
//! should be flushed but owns no timers itself. The engine arms and fires
//! timers and feeds the results back in, so the transitions here stay
//! directly testable.

use crate::types::SubtitleSegment;
use log::debug;
use std::collections::HashMap;

/// Result of appending a segment to a video's buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// Threshold reached: the batch was drained synchronously and any
    /// pending timer is now stale.
    Flush(Vec<SubtitleSegment>),
    /// First buffered segment since the last flush: the caller should arm
    /// a debounce timer carrying this generation.
    ArmTimer(u64),
    /// Appended; a timer is already armed.
    Buffered,
}

/// Buffer for one video's segments.
///
/// A generation counter stands in for timer cancellation: every flush bumps
/// it, so a timer that fires with an older generation is a no-op.
pub struct SegmentBuffer {
    segments: Vec<SubtitleSegment>,
    threshold: usize,
    timer_armed: bool,
    generation: u64,
}

impl SegmentBuffer {
    pub fn new(threshold: usize) -> Self {
        Self {
            segments: Vec::new(),
            threshold,
            timer_armed: false,
            generation: 0,
        }
    }

    /// Append a segment and report the required transition.
    pub fn push(&mut self, segment: SubtitleSegment) -> PushOutcome {
        self.segments.push(segment);

        if self.segments.len() >= self.threshold {
            return PushOutcome::Flush(self.take_batch());
        }

        if !self.timer_armed {
            self.timer_armed = true;
            PushOutcome::ArmTimer(self.generation)
        } else {
            PushOutcome::Buffered
        }
    }

    /// Handle a debounce timer expiry. Returns the batch to flush, or None
    /// when the timer is stale or the buffer is already empty.
    pub fn on_timer(&mut self, generation: u64) -> Option<Vec<SubtitleSegment>> {
        if generation != self.generation {
            debug!(
                "Ignoring stale flush timer (generation {} != {})",
                generation, self.generation
            );
            return None;
        }

        if self.segments.is_empty() {
            self.timer_armed = false;
            return None;
        }

        Some(self.take_batch())
    }

    /// Drain whatever is buffered regardless of timers (shutdown path).
    pub fn drain(&mut self) -> Option<Vec<SubtitleSegment>> {
        if self.segments.is_empty() {
            self.timer_armed = false;
            self.generation += 1;
            return None;
        }
        Some(self.take_batch())
    }

    fn take_batch(&mut self) -> Vec<SubtitleSegment> {
        self.timer_armed = false;
        self.generation += 1;
        std::mem::take(&mut self.segments)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }
}

/// Keyed table of per-video buffers. Each video's buffer and timer state is
/// independent; a new video id gets a fresh entry on first push.
pub struct BufferRegistry {
    buffers: HashMap<String, SegmentBuffer>,
    threshold: usize,
}

impl BufferRegistry {
    pub fn new(threshold: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            threshold,
        }
    }

    pub fn push(&mut self, video_id: &str, segment: SubtitleSegment) -> PushOutcome {
        self.buffers
            .entry(video_id.to_string())
            .or_insert_with(|| SegmentBuffer::new(self.threshold))
            .push(segment)
    }

    pub fn on_timer(&mut self, video_id: &str, generation: u64) -> Option<Vec<SubtitleSegment>> {
        self.buffers
            .get_mut(video_id)
            .and_then(|buffer| buffer.on_timer(generation))
    }

    /// Drain every non-empty buffer, returning (video id, batch) pairs.
    pub fn drain_all(&mut self) -> Vec<(String, Vec<SubtitleSegment>)> {
        self.buffers
            .iter_mut()
            .filter_map(|(video_id, buffer)| {
                buffer.drain().map(|batch| (video_id.clone(), batch))
            })
            .collect()
    }

    pub fn get(&self, video_id: &str) -> Option<&SegmentBuffer> {
        self.buffers.get(video_id)
    }
}
