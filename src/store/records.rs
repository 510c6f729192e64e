//! Row shapes for the `video_transcripts` and `transcript_chunks` tables

use crate::chunk::TranscriptChunk;
use crate::transcript::Segment;
use serde::{Deserialize, Serialize};

/// Insert/upsert payload for `video_transcripts`
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptRecord {
    pub youtube_id: String,
    pub video_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    /// Raw segments in order, as JSON
    pub full_transcript: Vec<Segment>,
}

impl TranscriptRecord {
    /// Build a record; the duration comes from the last segment's end
    pub fn new(youtube_id: &str, title: &str, creator: Option<&str>, segments: &[Segment]) -> Self {
        let duration = segments
            .iter()
            .map(Segment::end)
            .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))))
            .map(|secs| secs.round() as i64);

        Self {
            youtube_id: youtube_id.to_string(),
            video_id: youtube_id.to_string(),
            title: title.to_string(),
            creator: creator.map(str::to_string),
            duration_seconds: duration,
            full_transcript: segments.to_vec(),
        }
    }
}

/// A `video_transcripts` row without its transcript body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTranscript {
    pub id: String,
    pub youtube_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A `video_transcripts` row with its stored segment body
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptBody {
    pub id: String,
    pub youtube_id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Segments as written by ingest; older rows may hold plain text
    #[serde(default)]
    pub full_transcript: serde_json::Value,
}

/// Insert/upsert payload for `transcript_chunks`
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRecord {
    pub transcript_id: String,
    pub chunk_index: i64,
    pub chunk_text: String,
    pub start_seconds: i64,
    pub end_seconds: i64,
    pub start_timestamp: String,
    pub end_timestamp: String,
    /// Always sent, so re-chunking clears embeddings of changed text
    pub embedding: Option<Vec<f32>>,
}

impl ChunkRecord {
    /// Rows store whole seconds
    pub fn from_chunk(transcript_id: &str, chunk: &TranscriptChunk, embedding: Option<Vec<f32>>) -> Self {
        Self {
            transcript_id: transcript_id.to_string(),
            chunk_index: chunk.index as i64,
            chunk_text: chunk.text.clone(),
            start_seconds: chunk.start_seconds.round() as i64,
            end_seconds: chunk.end_seconds.round() as i64,
            start_timestamp: chunk.start_timestamp.clone(),
            end_timestamp: chunk.end_timestamp.clone(),
            embedding,
        }
    }
}

/// A chunk row that still needs an embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChunk {
    pub id: String,
    pub transcript_id: String,
    pub chunk_index: i64,
    pub chunk_text: String,
}

/// Outcome of writing a transcript's chunks
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkWriteStats {
    pub written: usize,
    pub failed_batches: usize,
    pub failed_rows: usize,
}

/// Embedding coverage across `transcript_chunks`
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmbeddingStats {
    pub total_chunks: u64,
    pub embedded: u64,
    pub missing: u64,
}

impl EmbeddingStats {
    pub fn coverage_percent(&self) -> f64 {
        if self.total_chunks == 0 {
            0.0
        } else {
            self.embedded as f64 / self.total_chunks as f64 * 100.0
        }
    }
}

/// Row filter for chunk counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFilter {
    All,
    Embedded,
    MissingEmbedding,
}

impl ChunkFilter {
    pub(crate) fn query(self) -> Option<(&'static str, &'static str)> {
        match self {
            ChunkFilter::All => None,
            ChunkFilter::Embedded => Some(("embedding", "not.is.null")),
            ChunkFilter::MissingEmbedding => Some(("embedding", "is.null")),
        }
    }
}
