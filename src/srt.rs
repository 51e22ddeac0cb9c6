//! SubRip (.srt) subtitle reading.
//!
//! The service's front door for batch ingestion: each cue becomes one
//! `SubtitleSegment` in file order, standing in for a live caption
//! observer.

use crate::types::SubtitleSegment;
use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

/// Read and parse an SRT file.
pub async fn read_srt_file(path: impl AsRef<Path>) -> Result<Vec<SubtitleSegment>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read subtitle file {:?}", path))?;
    parse_srt(&content).with_context(|| format!("failed to parse subtitle file {:?}", path))
}

/// Parse SRT content into ordered segments.
///
/// Cues are blank-line separated blocks: an optional numeric counter, a
/// `start --> end` timing line, and one or more text lines (joined with a
/// space). Cues without text are dropped.
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleSegment>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut segments = Vec::new();

    for block in content.split("\n\n") {
        let mut lines = block
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .peekable();

        let Some(first) = lines.peek() else {
            continue;
        };

        // Skip the cue counter if present.
        if first.chars().all(|c| c.is_ascii_digit()) {
            lines.next();
        }

        let Some(timing) = lines.next() else {
            continue;
        };
        let (start_ms, end_ms) = parse_timing_line(timing)?;

        let text = lines.collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            continue;
        }

        segments.push(SubtitleSegment {
            start_ms,
            end_ms,
            text,
        });
    }

    Ok(segments)
}

fn parse_timing_line(line: &str) -> Result<(i64, i64)> {
    let (start, end) = line
        .split_once("-->")
        .ok_or_else(|| anyhow!("missing '-->' in timing line '{}'", line))?;
    Ok((
        parse_timestamp(start.trim())?,
        parse_timestamp(end.trim())?,
    ))
}

/// Parse `HH:MM:SS,mmm` (SRT) or `HH:MM:SS.mmm` into milliseconds.
fn parse_timestamp(value: &str) -> Result<i64> {
    let (clock, millis) = value
        .split_once([',', '.'])
        .ok_or_else(|| anyhow!("timestamp '{}' has no millisecond part", value))?;

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        bail!("timestamp '{}' is not HH:MM:SS,mmm", value);
    }

    let hours: i64 = parts[0]
        .parse()
        .with_context(|| format!("bad hours in timestamp '{}'", value))?;
    let minutes: i64 = parts[1]
        .parse()
        .with_context(|| format!("bad minutes in timestamp '{}'", value))?;
    let seconds: i64 = parts[2]
        .parse()
        .with_context(|| format!("bad seconds in timestamp '{}'", value))?;
    // The millisecond field is fractional seconds, so a short field scales
    // up: "1,5" is 1500 ms, not 1005 ms.
    let scale = match millis.len() {
        1 => 100,
        2 => 10,
        3 => 1,
        _ => bail!("timestamp '{}' has a bad millisecond part", value),
    };
    let millis: i64 = millis
        .parse()
        .with_context(|| format!("bad milliseconds in timestamp '{}'", value))?;

    Ok(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis * scale)
}
