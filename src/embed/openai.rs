use super::{prepare_text, Embedder};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// A failed request and whether sending it again can help
struct RequestFailure {
    error: Error,
    retryable: bool,
}

impl RequestFailure {
    fn retryable(error: Error) -> Self {
        Self {
            error,
            retryable: true,
        }
    }
}

/// Client errors other than rate limiting will fail the same way again
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || !status.is_client_error()
}

/// Embeddings over the OpenAI `/v1/embeddings` API
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    dimension: usize,
    retries: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        dimension: usize,
        retries: usize,
    ) -> Result<Self> {
        let base = Url::parse(base_url)?;
        let endpoint = base
            .join("/v1/embeddings")
            .map_err(|e| Error::Config(format!("Invalid embedding base URL: {}", e)))?;
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: model.to_string(),
            dimension,
            retries,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.api_key()?,
            &config.model,
            config.dimension,
            config.retries,
        )
    }

    async fn request(&self, input: &[String]) -> std::result::Result<Vec<Vec<f32>>, RequestFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: input.to_vec(),
            })
            .send()
            .await
            .map_err(|e| RequestFailure::retryable(Error::Embedding(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure {
                error: Error::Embedding(format!("{} returned {}: {}", self.endpoint, status, body)),
                retryable: is_retryable_status(status),
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            RequestFailure::retryable(Error::Embedding(format!("Invalid embedding response: {}", e)))
        })?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn validate(&self, expected: usize, embeddings: &[Vec<f32>]) -> Result<()> {
        if embeddings.len() != expected {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                embeddings.len()
            )));
        }
        if let Some(mismatch) = embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model,
                self.dimension,
                mismatch.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let input: Vec<String> = texts.iter().map(|t| prepare_text(t)).collect();
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.retries {
            match self.request(&input).await {
                Ok(embeddings) => {
                    self.validate(input.len(), &embeddings)?;
                    return Ok(embeddings);
                }
                Err(failure) if !failure.retryable => return Err(failure.error),
                Err(failure) => {
                    warn!("Embedding attempt {} failed: {}", attempt + 1, failure.error);
                    last_err = Some(failure.error);
                }
            }

            if attempt < self.retries {
                tokio::time::sleep(Duration::from_millis(500 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Embedding("Embedding request failed".to_string())))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
