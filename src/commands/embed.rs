//! Embed command - backfill embeddings for stored chunks

use crate::config::Config;
use crate::embed::{prepare_text, Embedder};
use crate::error::{Error, Result};
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::store::{PendingChunk, SupabaseStore};
use serde::Serialize;
use tracing::{info, warn};

/// Backfill statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillStats {
    pub pending: usize,
    pub embedded: usize,
    pub failed: usize,
    pub batches: usize,
}

/// Embed every chunk that has no embedding yet.
///
/// A failed embedding call fails the whole batch's chunks; a failed row
/// update fails only that chunk. Neither stops the run.
pub async fn cmd_embed(
    config: &Config,
    store: &SupabaseStore,
    embedder: &dyn Embedder,
    limit: Option<usize>,
) -> Result<BackfillStats> {
    if embedder.dimension() != config.embedding.dimension {
        return Err(Error::Embedding(format!(
            "Model {} produces {} dimensions, config expects {}",
            embedder.model_name(),
            embedder.dimension(),
            config.embedding.dimension
        )));
    }

    let pending = store.chunks_missing_embeddings(limit).await?;
    let mut stats = BackfillStats {
        pending: pending.len(),
        ..Default::default()
    };

    if pending.is_empty() {
        info!("All chunks already have embeddings");
        return Ok(stats);
    }
    info!("Embedding {} chunks with {}", pending.len(), embedder.model_name());

    let batch_size = config.embedding.batch_size.max(1);
    let total_batches = pending.len().div_ceil(batch_size);
    let progress = start_progress_bar(pending.len(), "Embedding chunks");

    for (i, batch) in pending.chunks(batch_size).enumerate() {
        stats.batches += 1;
        embed_batch(store, embedder, batch, &mut stats).await;
        advance_progress(&progress, batch.len() as u64);

        if i + 1 < total_batches && !config.embedding.batch_delay().is_zero() {
            tokio::time::sleep(config.embedding.batch_delay()).await;
        }
    }

    finish_progress(progress, "Embeddings stored");
    Ok(stats)
}

async fn embed_batch(
    store: &SupabaseStore,
    embedder: &dyn Embedder,
    batch: &[PendingChunk],
    stats: &mut BackfillStats,
) {
    let texts = batch.iter().map(|c| prepare_text(&c.chunk_text)).collect();
    let vectors = match embedder.embed(texts).await {
        Ok(vectors) => vectors,
        Err(e) => {
            warn!("Embedding batch of {} chunks failed: {}", batch.len(), e);
            stats.failed += batch.len();
            return;
        }
    };

    for (chunk, vector) in batch.iter().zip(vectors.iter()) {
        match store.set_chunk_embedding(&chunk.id, vector).await {
            Ok(()) => stats.embedded += 1,
            Err(e) => {
                warn!(
                    transcript_id = %chunk.transcript_id,
                    chunk = chunk.chunk_index,
                    "Failed to store embedding: {}",
                    e
                );
                stats.failed += 1;
            }
        }
    }
    // The embedder returned fewer vectors than requested
    stats.failed += batch.len().saturating_sub(vectors.len());
}

/// Print backfill statistics
pub fn print_backfill_stats(stats: &BackfillStats) {
    println!("\n✓ Embedding backfill complete");
    println!("  Chunks pending: {}", stats.pending);
    println!("  Embedded: {}", stats.embedded);
    println!("  Failed: {}", stats.failed);
    println!("  Batches: {}", stats.batches);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct TinyEmbedder {
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl Embedder for TinyEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            if let Some(bad) = self.fail_on {
                if texts.iter().any(|t| t == bad) {
                    return Err(Error::Embedding("rate limited".to_string()));
                }
            }
            Ok(texts.iter().map(|_| vec![0.1, 0.2]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "tiny"
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.embedding.dimension = 2;
        config.embedding.batch_size = 2;
        config.embedding.batch_delay_ms = 0;
        config
    }

    async fn pending_server(rows: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/transcript_chunks"))
            .and(query_param("embedding", "is.null"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&server)
            .await;
        server
    }

    fn rows() -> serde_json::Value {
        json!([
            { "id": "c-1", "transcript_id": "t-1", "chunk_index": 0, "chunk_text": "one" },
            { "id": "c-2", "transcript_id": "t-1", "chunk_index": 1, "chunk_text": "two" },
            { "id": "c-3", "transcript_id": "t-1", "chunk_index": 2, "chunk_text": "three" }
        ])
    }

    #[tokio::test]
    async fn test_backfill_updates_each_chunk() {
        let server = pending_server(rows()).await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/transcript_chunks"))
            .respond_with(ResponseTemplate::new(204))
            .expect(3)
            .mount(&server)
            .await;
        let store = SupabaseStore::new(&server.uri(), "key").unwrap();

        let stats = cmd_embed(&config(), &store, &TinyEmbedder { fail_on: None }, None)
            .await
            .unwrap();
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.embedded, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.batches, 2);
    }

    #[tokio::test]
    async fn test_failures_are_counted_per_chunk() {
        let server = pending_server(rows()).await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/transcript_chunks"))
            .and(query_param("id", "eq.c-3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let store = SupabaseStore::new(&server.uri(), "key").unwrap();

        // First batch (one, two) fails to embed; third chunk fails to store
        let stats = cmd_embed(&config(), &store, &TinyEmbedder { fail_on: Some("two") }, None)
            .await
            .unwrap();
        assert_eq!(stats.embedded, 0);
        assert_eq!(stats.failed, 3);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let server = pending_server(json!([])).await;
        let store = SupabaseStore::new(&server.uri(), "key").unwrap();
        let mut config = config();
        config.embedding.dimension = 1536;

        let result = cmd_embed(&config, &store, &TinyEmbedder { fail_on: None }, None).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
