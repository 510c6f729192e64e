//! Ingest command: curriculum videos to transcripts, chunks and embeddings

use crate::chunk::chunk_segments;
use crate::config::Config;
use crate::curriculum::{is_valid_youtube_id, Curriculum};
use crate::embed::{embed_in_batches, prepare_text, Embedder};
use crate::error::{Error, Result};
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::store::{ChunkRecord, SupabaseStore, TranscriptRecord};
use crate::transcript::{fetch_with_retry, TranscriptFetcher};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Ingest options
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Only videos of this module
    pub module_id: Option<String>,
    /// Explicit YouTube ids instead of the curriculum
    pub video_ids: Vec<String>,
    /// Embed chunks while ingesting
    pub embed: bool,
    /// Leave videos that already have a transcript row alone
    pub skip_existing: bool,
    /// Videos processed concurrently (overrides config)
    pub batch_size: Option<usize>,
}

/// A video to ingest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestTarget {
    pub youtube_id: String,
    pub title: String,
    pub creator: Option<String>,
}

/// What happened to one video
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VideoOutcome {
    Stored {
        chunks: usize,
        embedded: usize,
        failed_rows: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub youtube_id: String,
    pub title: String,
    #[serde(flatten)]
    pub outcome: VideoOutcome,
}

/// Ingest statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub videos: usize,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub chunks_written: usize,
    pub chunks_embedded: usize,
    pub failed_chunk_rows: usize,
    pub reports: Vec<VideoReport>,
}

impl IngestStats {
    fn record(&mut self, target: &IngestTarget, outcome: VideoOutcome) {
        self.videos += 1;
        match &outcome {
            VideoOutcome::Stored {
                chunks,
                embedded,
                failed_rows,
            } => {
                self.stored += 1;
                self.chunks_written += chunks;
                self.chunks_embedded += embedded;
                self.failed_chunk_rows += failed_rows;
            }
            VideoOutcome::Skipped { .. } => self.skipped += 1,
            VideoOutcome::Failed { .. } => self.failed += 1,
        }
        self.reports.push(VideoReport {
            youtube_id: target.youtube_id.clone(),
            title: target.title.clone(),
            outcome,
        });
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Non-placeholder curriculum videos, first occurrence of each id
pub fn collect_targets(curriculum: &Curriculum, module_id: Option<&str>) -> Result<Vec<IngestTarget>> {
    if let Some(id) = module_id {
        if curriculum.find_module(id).is_none() {
            return Err(Error::Curriculum(format!("Module not found: {}", id)));
        }
    }

    let mut seen = HashSet::new();
    Ok(curriculum
        .videos()
        .filter(|v| module_id.map_or(true, |id| v.module.id == id))
        .filter(|v| !v.video.is_placeholder())
        .filter(|v| seen.insert(v.video.youtube_id.clone()))
        .map(|v| IngestTarget {
            youtube_id: v.video.youtube_id.clone(),
            title: v.video.title.clone(),
            creator: non_empty(&v.video.creator),
        })
        .collect())
}

/// Targets for explicit ids; titles come from the curriculum when known
pub fn explicit_targets(curriculum: Option<&Curriculum>, ids: &[String]) -> Result<Vec<IngestTarget>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for id in ids {
        let id = id.trim();
        if !is_valid_youtube_id(id) {
            return Err(Error::InvalidVideoId(id.to_string()));
        }
        if !seen.insert(id.to_string()) {
            continue;
        }

        let known = curriculum.and_then(|c| c.videos().find(|v| v.video.youtube_id == id));
        targets.push(IngestTarget {
            youtube_id: id.to_string(),
            title: known
                .as_ref()
                .map(|v| v.video.title.clone())
                .unwrap_or_else(|| id.to_string()),
            creator: known.as_ref().and_then(|v| non_empty(&v.video.creator)),
        });
    }

    Ok(targets)
}

/// Everything one video needs to go from id to stored chunks
pub struct Pipeline<'a> {
    pub config: &'a Config,
    pub store: &'a SupabaseStore,
    pub fetcher: &'a dyn TranscriptFetcher,
    pub embedder: Option<&'a dyn Embedder>,
    pub skip_existing: bool,
}

impl Pipeline<'_> {
    /// Fetch, chunk, embed and store one video. Never fails the batch.
    pub async fn process(&self, target: &IngestTarget) -> VideoOutcome {
        match self.try_process(target).await {
            Ok(outcome) => outcome,
            Err(e) => VideoOutcome::Failed {
                error: e.to_string(),
            },
        }
    }

    async fn try_process(&self, target: &IngestTarget) -> Result<VideoOutcome> {
        let id = target.youtube_id.as_str();

        if self.skip_existing && self.store.transcript_exists(id).await? {
            return Ok(VideoOutcome::Skipped {
                reason: "transcript already stored".to_string(),
            });
        }

        let segments = match fetch_with_retry(
            self.fetcher,
            id,
            self.config.ingest.fetch_attempts,
            self.config.ingest.retry_backoff(),
        )
        .await
        {
            Ok(segments) => segments,
            Err(Error::TranscriptUnavailable { reason, .. }) => {
                return Ok(VideoOutcome::Skipped { reason });
            }
            Err(e) => return Err(e),
        };

        let chunks = chunk_segments(&segments, &self.config.chunk);
        let embeddings = match self.embedder {
            Some(embedder) if !chunks.is_empty() => {
                let texts = chunks.iter().map(|c| prepare_text(&c.text)).collect();
                match embed_in_batches(
                    embedder,
                    texts,
                    self.config.embedding.batch_size,
                    self.config.embedding.batch_delay(),
                )
                .await
                {
                    Ok(vectors) => Some(vectors),
                    Err(e) => {
                        warn!(video = id, "Embedding failed, storing chunks without vectors: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let record = TranscriptRecord::new(id, &target.title, target.creator.as_deref(), &segments);
        let transcript_id = self.store.upsert_transcript(&record).await?;

        let rows: Vec<ChunkRecord> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let vector = embeddings.as_ref().and_then(|e| e.get(i).cloned());
                ChunkRecord::from_chunk(&transcript_id, chunk, vector)
            })
            .collect();
        let write = self
            .store
            .upsert_chunks(&transcript_id, &rows, self.config.supabase.insert_batch_size)
            .await?;

        Ok(VideoOutcome::Stored {
            chunks: write.written,
            embedded: if embeddings.is_some() { write.written } else { 0 },
            failed_rows: write.failed_rows,
        })
    }
}

/// Execute ingest: small concurrent batches with a fixed pause between them
pub async fn cmd_ingest(
    config: &Config,
    store: &SupabaseStore,
    fetcher: &dyn TranscriptFetcher,
    embedder: Option<&dyn Embedder>,
    targets: Vec<IngestTarget>,
    options: &IngestOptions,
) -> Result<IngestStats> {
    let batch_size = options.batch_size.unwrap_or(config.ingest.batch_size).max(1);
    info!(
        "Ingesting {} videos in batches of {}",
        targets.len(),
        batch_size
    );

    let pipeline = Pipeline {
        config,
        store,
        fetcher,
        embedder: if options.embed { embedder } else { None },
        skip_existing: options.skip_existing,
    };

    let mut stats = IngestStats::default();
    let total_batches = targets.len().div_ceil(batch_size);
    let progress = start_progress_bar(targets.len(), "Ingesting transcripts");

    for (i, batch) in targets.chunks(batch_size).enumerate() {
        let outcomes = join_all(batch.iter().map(|target| pipeline.process(target))).await;

        for (target, outcome) in batch.iter().zip(outcomes) {
            match &outcome {
                VideoOutcome::Stored { chunks, .. } => {
                    info!(video = %target.youtube_id, "Stored {} chunks", chunks)
                }
                VideoOutcome::Skipped { reason } => {
                    info!(video = %target.youtube_id, "Skipped: {}", reason)
                }
                VideoOutcome::Failed { error } => {
                    warn!(video = %target.youtube_id, "Failed: {}", error)
                }
            }
            stats.record(target, outcome);
        }
        advance_progress(&progress, batch.len() as u64);

        if i + 1 < total_batches && !config.ingest.batch_delay().is_zero() {
            tokio::time::sleep(config.ingest.batch_delay()).await;
        }
    }

    finish_progress(progress, "Transcripts processed");
    Ok(stats)
}

/// Print ingest statistics
pub fn print_ingest_stats(stats: &IngestStats) {
    println!("\n✓ Transcript ingestion complete");
    println!("  Videos: {}", stats.videos);
    println!("  Stored: {}", stats.stored);
    println!("  Skipped: {}", stats.skipped);
    println!("  Failed: {}", stats.failed);
    println!("  Chunks written: {}", stats.chunks_written);
    println!("  Chunks embedded: {}", stats.chunks_embedded);
    if stats.failed_chunk_rows > 0 {
        println!("  Chunk rows not written: {}", stats.failed_chunk_rows);
    }

    let problems: Vec<&VideoReport> = stats
        .reports
        .iter()
        .filter(|r| !matches!(r.outcome, VideoOutcome::Stored { .. }))
        .collect();
    if !problems.is_empty() {
        println!("\nNot stored:");
        for report in problems {
            match &report.outcome {
                VideoOutcome::Skipped { reason } => {
                    println!("  ⏭ {} ({}): {}", report.title, report.youtube_id, reason)
                }
                VideoOutcome::Failed { error } => {
                    println!("  ✗ {} ({}): {}", report.title, report.youtube_id, error)
                }
                VideoOutcome::Stored { .. } => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::tests::sample;
    use crate::transcript::{FileTranscriptFetcher, Segment, TimeUnit};
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeFetcher;

    #[async_trait]
    impl TranscriptFetcher for FakeFetcher {
        async fn fetch(&self, youtube_id: &str) -> Result<Vec<Segment>> {
            match youtube_id {
                "abcdefghijk" => Err(Error::TranscriptUnavailable {
                    video: youtube_id.to_string(),
                    reason: "captions disabled".to_string(),
                }),
                _ => Ok((0..4)
                    .map(|i| Segment::new(format!("line {}", i), i as f64 * 20.0, 10.0))
                    .collect()),
            }
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; 3]).collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    async fn mock_store(server: &MockServer) -> SupabaseStore {
        Mock::given(method("POST"))
            .and(path("/rest/v1/video_transcripts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "t-1" }])))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/transcript_chunks"))
            .respond_with(ResponseTemplate::new(201))
            .mount(server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/transcript_chunks"))
            .respond_with(ResponseTemplate::new(204))
            .mount(server)
            .await;
        SupabaseStore::new(&server.uri(), "key").unwrap()
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.ingest.batch_delay_ms = 0;
        config.ingest.retry_backoff_ms = 0;
        config.embedding.batch_delay_ms = 0;
        config
    }

    #[test]
    fn test_collect_targets_skips_placeholders() {
        let targets = collect_targets(&sample(), None).unwrap();
        let ids: Vec<&str> = targets.iter().map(|t| t.youtube_id.as_str()).collect();
        assert_eq!(ids, vec!["dQw4w9WgXcQ", "abcdefghijk"]);
        assert_eq!(targets[0].creator.as_deref(), Some("BloxDev"));

        assert!(collect_targets(&sample(), Some("module-9")).is_err());
        assert_eq!(collect_targets(&sample(), Some("module-1")).unwrap().len(), 2);
    }

    #[test]
    fn test_explicit_targets() {
        let curriculum = sample();
        let ids = vec!["dQw4w9WgXcQ".to_string(), "zzzzzzzzzzz".to_string(), "dQw4w9WgXcQ".to_string()];
        let targets = explicit_targets(Some(&curriculum), &ids).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].title, "Studio Tour");
        assert_eq!(targets[1].title, "zzzzzzzzzzz");

        assert!(matches!(
            explicit_targets(None, &["bad".to_string()]),
            Err(Error::InvalidVideoId(_))
        ));
    }

    #[tokio::test]
    async fn test_ingest_records_each_outcome() {
        let server = MockServer::start().await;
        let store = mock_store(&server).await;
        let config = quiet_config();
        let targets = collect_targets(&sample(), None).unwrap();
        let options = IngestOptions {
            embed: true,
            ..Default::default()
        };

        let stats = cmd_ingest(&config, &store, &FakeFetcher, Some(&FixedEmbedder), targets, &options)
            .await
            .unwrap();

        assert_eq!(stats.videos, 2);
        assert_eq!(stats.stored, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 0);
        // 4 segments 20 s apart in 30 s windows
        assert_eq!(stats.chunks_written, 2);
        assert_eq!(stats.chunks_embedded, 2);
        assert_eq!(
            stats.reports[1].outcome,
            VideoOutcome::Skipped {
                reason: "captions disabled".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_per_video() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/video_transcripts"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;
        let store = SupabaseStore::new(&server.uri(), "key").unwrap();
        let targets = vec![IngestTarget {
            youtube_id: "dQw4w9WgXcQ".to_string(),
            title: "Studio Tour".to_string(),
            creator: None,
        }];

        let stats = cmd_ingest(
            &quiet_config(),
            &store,
            &FakeFetcher,
            None,
            targets,
            &IngestOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(stats.failed, 1);
        assert!(matches!(stats.reports[0].outcome, VideoOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_ingest_from_exported_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("dQw4w9WgXcQ.json"),
            r#"{"transcript": [
                {"text": "welcome", "offset": 0, "duration": 4000},
                {"text": "to studio", "offset": 45000, "duration": 3000}
            ]}"#,
        )
        .unwrap();
        let fetcher = FileTranscriptFetcher::open(tmp.path(), TimeUnit::Milliseconds).unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/video_transcripts"))
            .and(body_partial_json(json!([{
                "youtube_id": "dQw4w9WgXcQ",
                "full_transcript": [{ "text": "welcome", "start": 0.0, "duration": 4.0 }]
            }])))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "t-1" }])))
            .expect(1)
            .mount(&server)
            .await;
        let store = mock_store(&server).await;

        let targets = collect_targets(&sample(), None).unwrap();
        let stats = cmd_ingest(
            &quiet_config(),
            &store,
            &fetcher,
            None,
            targets,
            &IngestOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(stats.stored, 1);
        assert_eq!(stats.chunks_written, 2);
        // No file for the second curriculum video
        assert_eq!(stats.skipped, 1);
    }
}
