//! Transcript chunking
//!
//! Turns a sorted list of caption segments into time-bounded text chunks,
//! the unit of retrieval and citation. Two strategies exist:
//! - `Window`: fixed, non-overlapping time windows (default)
//! - `Overlap`: token-budgeted chunks that repeat the tail of the previous
//!   chunk for context
//!
//! Only the window strategy places every segment in exactly one chunk.

mod overlap;

pub use overlap::*;

use crate::config::ChunkConfig;
use crate::error::{Error, Result};
use crate::transcript::Segment;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A time-bounded slice of a transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Chunk index (0-based, contiguous)
    pub index: usize,
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// `MM:SS`
    pub start_timestamp: String,
    /// `MM:SS`
    pub end_timestamp: String,
    /// Number of source segments that contributed text
    pub segment_count: usize,
}

impl TranscriptChunk {
    fn new(index: usize, text: String, start: f64, end: f64, segment_count: usize) -> Self {
        let end = end.max(start);
        Self {
            index,
            text,
            start_seconds: start,
            end_seconds: end,
            start_timestamp: format_timestamp(start),
            end_timestamp: format_timestamp(end),
            segment_count,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Chunking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    #[default]
    Window,
    Overlap,
}

impl FromStr for ChunkStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "window" | "fixed" => Ok(ChunkStrategy::Window),
            "overlap" | "sliding" => Ok(ChunkStrategy::Overlap),
            _ => Err(Error::Config(format!("Unknown chunk strategy: {}", s))),
        }
    }
}

impl std::fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkStrategy::Window => write!(f, "window"),
            ChunkStrategy::Overlap => write!(f, "overlap"),
        }
    }
}

/// Chunk segments with the configured strategy
pub fn chunk_segments(segments: &[Segment], config: &ChunkConfig) -> Vec<TranscriptChunk> {
    match config.strategy {
        ChunkStrategy::Window => chunk_by_window(segments, config.window_secs),
        ChunkStrategy::Overlap => {
            chunk_with_overlap(segments, config.max_tokens, config.overlap_tokens)
        }
    }
}

/// Partition segments into fixed time windows.
///
/// A chunk opens at its first segment's start. The next segment joins the
/// chunk while it starts before `chunk_start + window`; otherwise it opens a
/// new chunk. A chunk ends where its last segment ends, so a single segment
/// longer than the window still forms one (long) chunk.
pub fn chunk_by_window(segments: &[Segment], window_secs: f64) -> Vec<TranscriptChunk> {
    let mut chunks = Vec::new();
    let mut texts: Vec<&str> = Vec::new();
    let mut chunk_start = 0.0;
    let mut chunk_end = 0.0;

    for segment in segments {
        let text = segment.text.trim();
        if text.is_empty() {
            continue;
        }

        if !texts.is_empty() && segment.start - chunk_start >= window_secs {
            chunks.push(TranscriptChunk::new(
                chunks.len(),
                texts.join(" "),
                chunk_start,
                chunk_end,
                texts.len(),
            ));
            texts.clear();
        }

        if texts.is_empty() {
            chunk_start = segment.start;
            chunk_end = segment.end();
        } else {
            chunk_end = f64::max(chunk_end, segment.end());
        }
        texts.push(text);
    }

    if !texts.is_empty() {
        chunks.push(TranscriptChunk::new(
            chunks.len(),
            texts.join(" "),
            chunk_start,
            chunk_end,
            texts.len(),
        ));
    }

    chunks
}

/// Format seconds as `MM:SS` with zero-padded minutes.
///
/// Minutes are not wrapped into hours, so 2 hours is `120:00`. Negative and
/// non-finite inputs format as `00:00`.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Parse `MM:SS` or `HH:MM:SS` into whole seconds
pub fn parse_duration(text: &str) -> Option<u64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let nums: Option<Vec<u64>> = parts.iter().map(|p| p.trim().parse::<u64>().ok()).collect();
    match nums?.as_slice() {
        [m, s] => Some(m * 60 + s),
        [h, m, s] => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}
