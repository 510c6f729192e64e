//! Custom error types for bloxbuddy

use thiserror::Error;

/// Main error type for bloxbuddy operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Supabase error ({status}): {message}")]
    Supabase { status: u16, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("YouTube API error: {0}")]
    YouTube(String),

    #[error("YouTube API quota exceeded")]
    QuotaExceeded,

    #[error("Transcript unavailable for {video}: {reason}")]
    TranscriptUnavailable { video: String, reason: String },

    #[error("Transcript fetch failed for {video}: {reason}")]
    TranscriptFetch { video: String, reason: String },

    #[error("Curriculum error: {0}")]
    Curriculum(String),

    #[error("Invalid video id: {0}")]
    InvalidVideoId(String),

    #[error("Curriculum validation failed with {0} error(s)")]
    ValidationFailed(usize),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl Error {
    /// Whether retrying the same transcript request could succeed
    pub fn is_retryable_fetch(&self) -> bool {
        matches!(self, Error::TranscriptFetch { .. } | Error::Http(_))
    }
}

/// Result type alias for bloxbuddy
pub type Result<T> = std::result::Result<T, Error>;
