//! Chunk command - offline chunking of an exported transcript file

use crate::chunk::{chunk_segments, ChunkStrategy, TranscriptChunk};
use crate::config::{ChunkConfig, Config};
use crate::error::Result;
use crate::transcript::{load_transcript_file, TimeUnit};
use serde::Serialize;
use std::path::Path;

/// Overrides for a single preview run
#[derive(Debug, Clone, Default)]
pub struct ChunkOptions {
    pub unit: TimeUnit,
    pub window_secs: Option<f64>,
    pub strategy: Option<ChunkStrategy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkPreview {
    pub strategy: ChunkStrategy,
    pub segments: usize,
    pub chunks: Vec<TranscriptChunk>,
}

/// Chunk a transcript JSON file without touching the network
pub fn cmd_chunk(config: &Config, file: &Path, options: &ChunkOptions) -> Result<ChunkPreview> {
    let segments = load_transcript_file(file, options.unit)?;

    let mut config = config.clone();
    config.chunk = ChunkConfig {
        strategy: options.strategy.unwrap_or(config.chunk.strategy),
        window_secs: options.window_secs.unwrap_or(config.chunk.window_secs),
        ..config.chunk.clone()
    };
    config.validate()?;

    Ok(ChunkPreview {
        strategy: config.chunk.strategy,
        segments: segments.len(),
        chunks: chunk_segments(&segments, &config.chunk),
    })
}

/// Print chunk preview
pub fn print_chunks(preview: &ChunkPreview) {
    println!(
        "\n✂️  {} segments → {} chunks ({} strategy)\n",
        preview.segments,
        preview.chunks.len(),
        preview.strategy
    );

    for chunk in &preview.chunks {
        println!(
            "[{}] {} - {} ({} segments)",
            chunk.index, chunk.start_timestamp, chunk.end_timestamp, chunk.segment_count
        );
        println!("    {}", truncate(&chunk.text, 160));
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
