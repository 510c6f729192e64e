//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - An OpenAI-compatible HTTP backend
//! - Paced batch processing to stay under provider rate limits

mod openai;

pub use openai::*;

use crate::config::EmbeddingConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input in input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let embedder = OpenAiEmbedder::from_config(config)?;
    Ok(Box::new(embedder))
}

/// Collapse newlines so captions embed as one line of prose
pub fn prepare_text(text: &str) -> String {
    text.replace("\\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Embed texts in sequential batches with a fixed pause between batches.
///
/// No pause follows the last batch. Any batch failure aborts the whole call.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
    delay: Duration,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut all_embeddings = Vec::with_capacity(texts.len());
    let total_batches = texts.len().div_ceil(batch_size);

    for (i, chunk) in texts.chunks(batch_size).enumerate() {
        debug!("Embedding batch {}/{} ({} texts)", i + 1, total_batches, chunk.len());
        let embeddings = embedder.embed(chunk.to_vec()).await?;
        all_embeddings.extend(embeddings);

        if i + 1 < total_batches && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(all_embeddings)
}
