use super::{segments_from_value, Segment, TimeUnit, TranscriptFetcher};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

enum Source {
    /// One `<youtube_id>.json` per video
    Dir(PathBuf),
    /// A single JSON object keyed by YouTube id
    Bundle(Map<String, Value>),
}

/// Transcripts exported to disk earlier, served in place of YouTube
pub struct FileTranscriptFetcher {
    source: Source,
    unit: TimeUnit,
}

impl FileTranscriptFetcher {
    /// Open a directory of per-video files or a bundle file
    pub fn open(path: &Path, unit: TimeUnit) -> Result<Self> {
        let source = if path.is_dir() {
            Source::Dir(path.to_path_buf())
        } else {
            let content = std::fs::read_to_string(path)?;
            match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => Source::Bundle(map),
                _ => {
                    return Err(Error::Parse(format!(
                        "{} is not an object keyed by YouTube id",
                        path.display()
                    )))
                }
            }
        };
        Ok(Self { source, unit })
    }

    fn unavailable(youtube_id: &str, reason: &str) -> Error {
        Error::TranscriptUnavailable {
            video: youtube_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptFetcher for FileTranscriptFetcher {
    async fn fetch(&self, youtube_id: &str) -> Result<Vec<Segment>> {
        let value = match &self.source {
            Source::Dir(dir) => {
                let path = dir.join(format!("{}.json", youtube_id));
                if !path.exists() {
                    return Err(Self::unavailable(youtube_id, "no transcript file"));
                }
                let content = tokio::fs::read_to_string(&path).await?;
                serde_json::from_str(&content)?
            }
            Source::Bundle(map) => map
                .get(youtube_id)
                .cloned()
                .ok_or_else(|| Self::unavailable(youtube_id, "not in transcript file"))?,
        };

        let segments = segments_from_value(value, self.unit).map_err(|e| match e {
            Error::Parse(reason) => Error::Parse(format!("{}: {}", youtube_id, reason)),
            other => other,
        })?;
        if segments.is_empty() {
            return Err(Self::unavailable(youtube_id, "transcript is empty"));
        }

        debug!(video = youtube_id, segments = segments.len(), "Loaded transcript from file");
        Ok(segments)
    }
}
