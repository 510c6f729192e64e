//! Default values for configuration

use std::path::PathBuf;

/// Default curriculum file, relative to the working directory
pub fn default_curriculum_file() -> PathBuf {
    PathBuf::from("src/data/curriculum.json")
}

/// Default checkpoint file for the resumable YouTube search
pub fn default_checkpoint_file() -> PathBuf {
    PathBuf::from("youtube-search-checkpoint.json")
}

/// Default Supabase project URL
pub fn default_supabase_url() -> String {
    std::env::var("NEXT_PUBLIC_SUPABASE_URL").unwrap_or_else(|_| "http://127.0.0.1:54321".to_string())
}

/// Default environment variable holding the Supabase service key
pub fn default_supabase_key_env() -> String {
    "SUPABASE_SERVICE_ROLE_KEY".to_string()
}

/// Default rows per chunk write request
pub fn default_supabase_insert_batch() -> usize {
    50
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default embedding dimension
pub fn default_embedding_dimension() -> usize {
    1536
}

/// Default number of chunks per embedding request
pub fn default_embedding_batch_size() -> usize {
    10
}

/// Default pause between embedding batches (milliseconds)
pub fn default_embedding_batch_delay_ms() -> u64 {
    250
}

/// Default OpenAI-compatible API base URL
pub fn default_embedding_base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com".to_string())
}

/// Default environment variable holding the embedding API key
pub fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default retries for an embedding request
pub fn default_embedding_retries() -> usize {
    3
}

/// Default YouTube Data API base URL
pub fn default_youtube_base_url() -> String {
    "https://www.googleapis.com/youtube/v3/".to_string()
}

/// Default environment variable holding the YouTube API key
pub fn default_youtube_api_key_env() -> String {
    "YOUTUBE_API_KEY".to_string()
}

/// Default YouTube API requests per second
pub fn default_youtube_requests_per_second() -> u32 {
    5
}

/// Default pause between search queries (milliseconds)
pub fn default_youtube_search_delay_ms() -> u64 {
    1000
}

/// Default search results requested per query
pub fn default_youtube_max_results() -> u32 {
    5
}

/// Hours to wait after the daily quota was exhausted
pub fn default_youtube_quota_cooldown_hours() -> i64 {
    24
}

/// Default chunk window in seconds
pub fn default_chunk_window_secs() -> f64 {
    30.0
}

/// Default token budget for the overlap strategy
pub fn default_chunk_max_tokens() -> usize {
    500
}

/// Default overlap for the overlap strategy
pub fn default_chunk_overlap_tokens() -> usize {
    100
}

/// Default number of videos processed concurrently
pub fn default_ingest_batch_size() -> usize {
    5
}

/// Default pause between video batches (milliseconds)
pub fn default_ingest_batch_delay_ms() -> u64 {
    2000
}

/// Default transcript fetch attempts
pub fn default_ingest_fetch_attempts() -> u32 {
    3
}

/// Default linear backoff unit between fetch attempts (milliseconds)
pub fn default_ingest_retry_backoff_ms() -> u64 {
    1000
}

/// Default transcript language
pub fn default_ingest_language() -> String {
    "en".to_string()
}
