//! Supabase (PostgREST) storage for transcripts and chunks
//!
//! This module wraps the PostgREST HTTP interface and provides:
//! - Transcript upsert keyed on `youtube_id`
//! - Chunk upsert keyed on `(transcript_id, chunk_index)` with stale-row cleanup
//! - Embedding backfill queries and coverage counts

mod records;

pub use records::*;

use crate::config::SupabaseConfig;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const TRANSCRIPTS: &str = "video_transcripts";
const CHUNKS: &str = "transcript_chunks";

/// Rows fetched per page when listing
const PAGE_SIZE: usize = 1000;

/// Supabase store handle
pub struct SupabaseStore {
    client: Client,
    base_url: Url,
}

impl SupabaseStore {
    /// Connect using config; the key is read from the configured env var
    pub fn connect(config: &SupabaseConfig) -> Result<Self> {
        Self::new(&config.url, &config.key()?)
    }

    /// Create a store for a project URL and service key
    pub fn new(url: &str, key: &str) -> Result<Self> {
        debug!("Using Supabase at {}", url);

        let base_url = Url::parse(url)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| Error::Config(format!("Invalid Supabase key: {}", e)))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| Error::Config(format!("Invalid Supabase key: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.base_url
            .join(&format!("/rest/v1/{}", table))
            .map_err(|e| Error::Config(format!("Invalid Supabase URL: {}", e)))
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder> {
        Ok(self.client.request(method, self.table_url(table)?))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(Error::Supabase {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    /// Fetch every row of a query, one page at a time
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page = match limit {
                Some(limit) => PAGE_SIZE.min(limit.saturating_sub(rows.len())),
                None => PAGE_SIZE,
            };
            if page == 0 {
                break;
            }

            let request = self
                .request(Method::GET, table)?
                .query(query)
                .query(&[("limit", page.to_string()), ("offset", offset.to_string())]);
            let batch: Vec<T> = self.fetch_rows(request).await?;
            let fetched = batch.len();
            rows.extend(batch);
            offset += fetched;

            if fetched < page {
                break;
            }
        }

        Ok(rows)
    }

    /// Insert or update a transcript row, returning its id
    pub async fn upsert_transcript(&self, record: &TranscriptRecord) -> Result<String> {
        let request = self
            .request(Method::POST, TRANSCRIPTS)?
            .query(&[("on_conflict", "youtube_id"), ("select", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[record]);

        #[derive(serde::Deserialize)]
        struct IdRow {
            id: String,
        }

        let rows: Vec<IdRow> = self.fetch_rows(request).await?;
        let id = rows
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| Error::Supabase {
                status: 200,
                message: format!("Upsert of {} returned no row", record.youtube_id),
            })?;

        debug!(youtube_id = %record.youtube_id, id = %id, "Upserted transcript");
        Ok(id)
    }

    /// Write a transcript's chunks in batches, then delete rows beyond the
    /// new chunk count. A failed batch is logged and counted.
    pub async fn upsert_chunks(
        &self,
        transcript_id: &str,
        chunks: &[ChunkRecord],
        batch_size: usize,
    ) -> Result<ChunkWriteStats> {
        let mut stats = ChunkWriteStats::default();

        for (i, batch) in chunks.chunks(batch_size.max(1)).enumerate() {
            let request = self
                .request(Method::POST, CHUNKS)?
                .query(&[("on_conflict", "transcript_id,chunk_index")])
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(batch);

            match request.send().await.map_err(Error::from) {
                Ok(response) => match Self::check(response).await {
                    Ok(_) => stats.written += batch.len(),
                    Err(e) => {
                        warn!(transcript_id, "Chunk batch {} failed: {}", i + 1, e);
                        stats.failed_batches += 1;
                        stats.failed_rows += batch.len();
                    }
                },
                Err(e) => {
                    warn!(transcript_id, "Chunk batch {} failed: {}", i + 1, e);
                    stats.failed_batches += 1;
                    stats.failed_rows += batch.len();
                }
            }
        }

        self.delete_chunks_from(transcript_id, chunks.len()).await?;
        Ok(stats)
    }

    /// Delete chunk rows with `chunk_index >= from_index`
    pub async fn delete_chunks_from(&self, transcript_id: &str, from_index: usize) -> Result<()> {
        let request = self.request(Method::DELETE, CHUNKS)?.query(&[
            ("transcript_id", format!("eq.{}", transcript_id)),
            ("chunk_index", format!("gte.{}", from_index)),
        ]);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// Whether a transcript row exists for a YouTube id
    pub async fn transcript_exists(&self, youtube_id: &str) -> Result<bool> {
        let request = self.request(Method::GET, TRANSCRIPTS)?.query(&[
            ("select", "id".to_string()),
            ("youtube_id", format!("eq.{}", youtube_id)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<serde_json::Value> = self.fetch_rows(request).await?;
        Ok(!rows.is_empty())
    }

    /// All stored transcripts, newest first
    pub async fn list_transcripts(&self) -> Result<Vec<StoredTranscript>> {
        self.fetch_all(
            TRANSCRIPTS,
            &[
                (
                    "select",
                    "id,youtube_id,title,creator,duration_seconds,created_at".to_string(),
                ),
                ("order", "created_at.desc".to_string()),
            ],
            None,
        )
        .await
    }

    /// Stored transcripts with their segment bodies, all of them when
    /// `youtube_ids` is empty
    pub async fn transcript_bodies(&self, youtube_ids: &[String]) -> Result<Vec<TranscriptBody>> {
        let mut query = vec![
            ("select", "id,youtube_id,title,full_transcript".to_string()),
            ("order", "created_at.asc".to_string()),
        ];
        if !youtube_ids.is_empty() {
            query.push(("youtube_id", format!("in.({})", youtube_ids.join(","))));
        }
        self.fetch_all(TRANSCRIPTS, &query, None).await
    }

    /// Map transcript ids to titles
    pub async fn transcript_titles(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        let mut titles = HashMap::new();

        for batch in ids.chunks(100) {
            let request = self.request(Method::GET, TRANSCRIPTS)?.query(&[
                ("select", "id,title".to_string()),
                ("id", format!("in.({})", batch.join(","))),
            ]);

            #[derive(serde::Deserialize)]
            struct TitleRow {
                id: String,
                #[serde(default)]
                title: Option<String>,
            }

            let rows: Vec<TitleRow> = self.fetch_rows(request).await?;
            for row in rows {
                titles.insert(row.id, row.title.unwrap_or_else(|| "Unknown".to_string()));
            }
        }

        Ok(titles)
    }

    /// Chunks with a null embedding, ordered by transcript then index
    pub async fn chunks_missing_embeddings(&self, limit: Option<usize>) -> Result<Vec<PendingChunk>> {
        self.fetch_all(
            CHUNKS,
            &[
                ("select", "id,transcript_id,chunk_index,chunk_text".to_string()),
                ("embedding", "is.null".to_string()),
                ("order", "transcript_id,chunk_index".to_string()),
            ],
            limit,
        )
        .await
    }

    /// Store an embedding on one chunk row
    pub async fn set_chunk_embedding(&self, chunk_id: &str, embedding: &[f32]) -> Result<()> {
        let request = self
            .request(Method::PATCH, CHUNKS)?
            .query(&[("id", format!("eq.{}", chunk_id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "embedding": embedding }));
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// Exact row count of `transcript_chunks` matching a filter
    pub async fn count_chunks(&self, filter: ChunkFilter) -> Result<u64> {
        let mut query = vec![("select", "id".to_string()), ("limit", "1".to_string())];
        if let Some((column, condition)) = filter.query() {
            query.push((column, condition.to_string()));
        }

        let request = self
            .request(Method::GET, CHUNKS)?
            .query(&query)
            .header("Prefer", "count=exact");
        let response = Self::check(request.send().await?).await?;

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| Error::Supabase {
                status: response.status().as_u16(),
                message: "Response has no usable Content-Range header".to_string(),
            })
    }

    /// Total, embedded and missing chunk counts
    pub async fn embedding_stats(&self) -> Result<EmbeddingStats> {
        let total_chunks = self.count_chunks(ChunkFilter::All).await?;
        let missing = self.count_chunks(ChunkFilter::MissingEmbedding).await?;
        Ok(EmbeddingStats {
            total_chunks,
            embedded: total_chunks.saturating_sub(missing),
            missing,
        })
    }
}

/// Total from a `Content-Range` value such as `0-0/123` or `*/0`
pub(crate) fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}
