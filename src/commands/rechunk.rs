//! Rechunk command - rebuild chunk rows from stored transcripts
//!
//! Chunks are rewritten from the `full_transcript` column with the current
//! chunk settings. Rewritten rows carry no embedding; run `embed` afterwards.

use crate::chunk::chunk_segments;
use crate::config::Config;
use crate::error::Result;
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::store::{ChunkRecord, SupabaseStore, TranscriptBody};
use crate::transcript::{segments_from_value, TimeUnit};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct RechunkOptions {
    /// Only these YouTube ids (all stored transcripts when empty)
    pub video_ids: Vec<String>,
    /// Unit of the stored segment offsets
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RechunkOutcome {
    Rechunked { chunks: usize, failed_rows: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RechunkReport {
    pub youtube_id: String,
    pub title: String,
    #[serde(flatten)]
    pub outcome: RechunkOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RechunkStats {
    pub transcripts: usize,
    pub rechunked: usize,
    pub skipped: usize,
    pub chunks_written: usize,
    pub failed_chunk_rows: usize,
    pub reports: Vec<RechunkReport>,
}

impl RechunkStats {
    fn record(&mut self, body: &TranscriptBody, outcome: RechunkOutcome) {
        self.transcripts += 1;
        match &outcome {
            RechunkOutcome::Rechunked {
                chunks,
                failed_rows,
            } => {
                self.rechunked += 1;
                self.chunks_written += chunks;
                self.failed_chunk_rows += failed_rows;
            }
            RechunkOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.reports.push(RechunkReport {
            youtube_id: body.youtube_id.clone(),
            title: body.title.clone().unwrap_or_else(|| body.youtube_id.clone()),
            outcome,
        });
    }
}

async fn rechunk_one(
    config: &Config,
    store: &SupabaseStore,
    body: &TranscriptBody,
    unit: TimeUnit,
) -> Result<RechunkOutcome> {
    let segments = match segments_from_value(body.full_transcript.clone(), unit) {
        Ok(segments) if !segments.is_empty() => segments,
        Ok(_) => {
            return Ok(RechunkOutcome::Skipped {
                reason: "stored transcript has no segments".to_string(),
            })
        }
        Err(e) => {
            return Ok(RechunkOutcome::Skipped {
                reason: e.to_string(),
            })
        }
    };

    let rows: Vec<ChunkRecord> = chunk_segments(&segments, &config.chunk)
        .iter()
        .map(|chunk| ChunkRecord::from_chunk(&body.id, chunk, None))
        .collect();
    let write = store
        .upsert_chunks(&body.id, &rows, config.supabase.insert_batch_size)
        .await?;

    Ok(RechunkOutcome::Rechunked {
        chunks: write.written,
        failed_rows: write.failed_rows,
    })
}

/// Rechunk stored transcripts one at a time. A store error on one
/// transcript stops the run.
pub async fn cmd_rechunk(
    config: &Config,
    store: &SupabaseStore,
    options: &RechunkOptions,
) -> Result<RechunkStats> {
    let bodies = store.transcript_bodies(&options.video_ids).await?;
    let mut stats = RechunkStats::default();
    if bodies.is_empty() {
        info!("No stored transcripts to rechunk");
        return Ok(stats);
    }
    info!(
        "Rechunking {} transcripts with the {} strategy",
        bodies.len(),
        config.chunk.strategy
    );

    let progress = start_progress_bar(bodies.len(), "Rechunking transcripts");
    for body in &bodies {
        let outcome = rechunk_one(config, store, body, options.unit).await?;
        if let RechunkOutcome::Skipped { reason } = &outcome {
            warn!(video = %body.youtube_id, "Skipped: {}", reason);
        }
        stats.record(body, outcome);
        advance_progress(&progress, 1);
    }
    finish_progress(progress, "Transcripts rechunked");

    Ok(stats)
}

/// Print rechunk statistics
pub fn print_rechunk_stats(stats: &RechunkStats) {
    println!("\n✓ Rechunk complete");
    println!("  Transcripts: {}", stats.transcripts);
    println!("  Rechunked: {}", stats.rechunked);
    println!("  Skipped: {}", stats.skipped);
    println!("  Chunks written: {}", stats.chunks_written);
    if stats.failed_chunk_rows > 0 {
        println!("  Chunk rows not written: {}", stats.failed_chunk_rows);
    }

    for report in &stats.reports {
        if let RechunkOutcome::Skipped { reason } = &report.outcome {
            println!("  ⏭ {} ({}): {}", report.title, report.youtube_id, reason);
        }
    }
    if stats.chunks_written > 0 {
        println!("\nRewritten chunks have no embeddings: run `bloxbuddy embed`.");
    }
}
