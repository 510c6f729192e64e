//! Configuration management for bloxbuddy
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! Secrets never live in the file; it only names the environment variables
//! that hold them.

mod defaults;

pub use defaults::*;

use crate::chunk::ChunkStrategy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Local data files
    #[serde(default)]
    pub data: DataConfig,

    /// Supabase (PostgREST) connection
    #[serde(default)]
    pub supabase: SupabaseConfig,

    /// Embedding API configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// YouTube Data API configuration
    #[serde(default)]
    pub youtube: YouTubeConfig,

    /// Transcript chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Transcript ingestion configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Local data files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// The curriculum JSON file
    #[serde(default = "default_curriculum_file")]
    pub curriculum_file: PathBuf,

    /// Where timestamped backups go (defaults to the curriculum's directory)
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    /// Resume file for the YouTube search
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
}

/// Supabase configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL
    #[serde(default = "default_supabase_url")]
    pub url: String,

    /// Environment variable name for the service role key
    #[serde(default = "default_supabase_key_env")]
    pub key_env: String,

    /// Rows per chunk write request
    #[serde(default = "default_supabase_insert_batch")]
    pub insert_batch_size: usize,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Chunks per embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Fixed pause between embedding batches
    #[serde(default = "default_embedding_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Environment variable name for the API key
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,

    /// Retries per request
    #[serde(default = "default_embedding_retries")]
    pub retries: usize,
}

/// YouTube Data API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    /// API base URL
    #[serde(default = "default_youtube_base_url")]
    pub base_url: String,

    /// Environment variable name for the API key
    #[serde(default = "default_youtube_api_key_env")]
    pub api_key_env: String,

    /// Requests per second across all endpoints
    #[serde(default = "default_youtube_requests_per_second")]
    pub requests_per_second: u32,

    /// Pause between search queries
    #[serde(default = "default_youtube_search_delay_ms")]
    pub search_delay_ms: u64,

    /// Results requested per search
    #[serde(default = "default_youtube_max_results")]
    pub max_results: u32,

    /// Hours to wait after the daily quota was exhausted
    #[serde(default = "default_youtube_quota_cooldown_hours")]
    pub quota_cooldown_hours: i64,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Which chunking strategy to use
    #[serde(default)]
    pub strategy: ChunkStrategy,

    /// Window length for the fixed-window strategy
    #[serde(default = "default_chunk_window_secs")]
    pub window_secs: f64,

    /// Token budget per chunk for the overlap strategy
    #[serde(default = "default_chunk_max_tokens")]
    pub max_tokens: usize,

    /// Tokens carried over between chunks for the overlap strategy
    #[serde(default = "default_chunk_overlap_tokens")]
    pub overlap_tokens: usize,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Videos processed concurrently
    #[serde(default = "default_ingest_batch_size")]
    pub batch_size: usize,

    /// Pause between video batches
    #[serde(default = "default_ingest_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Transcript fetch attempts
    #[serde(default = "default_ingest_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Linear backoff unit between attempts
    #[serde(default = "default_ingest_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Preferred transcript language
    #[serde(default = "default_ingest_language")]
    pub language: String,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for bloxbuddy config
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            curriculum_file: default_curriculum_file(),
            backup_dir: None,
            checkpoint_file: default_checkpoint_file(),
        }
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: default_supabase_url(),
            key_env: default_supabase_key_env(),
            insert_batch_size: default_supabase_insert_batch(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            batch_delay_ms: default_embedding_batch_delay_ms(),
            base_url: default_embedding_base_url(),
            api_key_env: default_embedding_api_key_env(),
            retries: default_embedding_retries(),
        }
    }
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            base_url: default_youtube_base_url(),
            api_key_env: default_youtube_api_key_env(),
            requests_per_second: default_youtube_requests_per_second(),
            search_delay_ms: default_youtube_search_delay_ms(),
            max_results: default_youtube_max_results(),
            quota_cooldown_hours: default_youtube_quota_cooldown_hours(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            window_secs: default_chunk_window_secs(),
            max_tokens: default_chunk_max_tokens(),
            overlap_tokens: default_chunk_overlap_tokens(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_ingest_batch_size(),
            batch_delay_ms: default_ingest_batch_delay_ms(),
            fetch_attempts: default_ingest_fetch_attempts(),
            retry_backoff_ms: default_ingest_retry_backoff_ms(),
            language: default_ingest_language(),
        }
    }
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "text-embedding-ada-002" => Some(1536),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Pause between batches
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        read_env(&self.api_key_env)
    }
}

impl SupabaseConfig {
    /// Read the service key from the configured environment variable
    pub fn key(&self) -> Result<String> {
        read_env(&self.key_env)
    }
}

impl YouTubeConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        read_env(&self.api_key_env)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }
}

impl IngestConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::MissingEnv(name.to_string())),
    }
}

impl Config {
    /// Get the default base directory for bloxbuddy (~/.bloxbuddy)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bloxbuddy")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Directory that receives curriculum backups
    pub fn backup_dir(&self) -> PathBuf {
        self.data.backup_dir.clone().unwrap_or_else(|| {
            self.data
                .curriculum_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.chunk.window_secs.is_finite() && self.chunk.window_secs > 0.0) {
            return Err(Error::Config(
                "chunk.window_secs must be a positive number".to_string(),
            ));
        }

        if self.chunk.max_tokens == 0 {
            return Err(Error::Config("chunk.max_tokens must be positive".to_string()));
        }

        if self.chunk.overlap_tokens >= self.chunk.max_tokens {
            return Err(Error::Config(
                "chunk.overlap_tokens must be < chunk.max_tokens".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 || self.embedding.batch_size > 2048 {
            return Err(Error::Config(
                "embedding.batch_size must be between 1 and 2048".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        if let Some(expected) = embedding_dimension_for_model(&self.embedding.model) {
            if expected != self.embedding.dimension {
                return Err(Error::Config(format!(
                    "embedding.dimension {} does not match model '{}' ({})",
                    self.embedding.dimension, self.embedding.model, expected
                )));
            }
        }

        if self.embedding.batch_delay_ms > 60_000 || self.ingest.batch_delay_ms > 60_000 {
            return Err(Error::Config(
                "batch delays must not exceed 60000 ms".to_string(),
            ));
        }

        if self.supabase.insert_batch_size == 0 {
            return Err(Error::Config(
                "supabase.insert_batch_size must be positive".to_string(),
            ));
        }

        if self.ingest.batch_size == 0 {
            return Err(Error::Config("ingest.batch_size must be positive".to_string()));
        }

        if self.ingest.fetch_attempts == 0 {
            return Err(Error::Config(
                "ingest.fetch_attempts must be at least 1".to_string(),
            ));
        }

        if self.youtube.requests_per_second == 0 {
            return Err(Error::Config(
                "youtube.requests_per_second must be positive".to_string(),
            ));
        }

        if self.youtube.max_results == 0 || self.youtube.max_results > 50 {
            return Err(Error::Config(
                "youtube.max_results must be between 1 and 50".to_string(),
            ));
        }

        Ok(())
    }
}
