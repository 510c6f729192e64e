use super::{clean_caption, Segment};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use yt_transcript_rs::api::YouTubeTranscriptApi;

/// Source of caption segments for a YouTube video
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(&self, youtube_id: &str) -> Result<Vec<Segment>>;
}

/// Fetches captions through the YouTube watch page
pub struct YtTranscriptFetcher {
    api: YouTubeTranscriptApi,
    language: String,
}

impl YtTranscriptFetcher {
    pub fn new(language: &str) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::Other(format!("Failed to set up transcript client: {}", e)))?;
        Ok(Self {
            api,
            language: language.to_string(),
        })
    }
}

/// Classify a fetch failure message: permanent conditions are not retried
fn classify_failure(video: &str, message: String) -> Error {
    let lower = message.to_lowercase();
    let permanent = [
        "disabled",
        "unavailable",
        "no transcript",
        "not found",
        "private",
    ];
    if permanent.iter().any(|p| lower.contains(p)) {
        Error::TranscriptUnavailable {
            video: video.to_string(),
            reason: message,
        }
    } else {
        Error::TranscriptFetch {
            video: video.to_string(),
            reason: message,
        }
    }
}

#[async_trait]
impl TranscriptFetcher for YtTranscriptFetcher {
    async fn fetch(&self, youtube_id: &str) -> Result<Vec<Segment>> {
        let languages = [self.language.as_str()];
        let transcript = self
            .api
            .fetch_transcript(youtube_id, &languages, false)
            .await
            .map_err(|e| classify_failure(youtube_id, e.to_string()))?;

        let segments: Vec<Segment> = transcript
            .snippets
            .iter()
            .map(|s| Segment::new(clean_caption(&s.text), s.start, s.duration))
            .filter(|s| !s.text.is_empty())
            .collect();

        if segments.is_empty() {
            return Err(Error::TranscriptUnavailable {
                video: youtube_id.to_string(),
                reason: "transcript is empty".to_string(),
            });
        }

        debug!(video = youtube_id, segments = segments.len(), "Fetched transcript");
        Ok(segments)
    }
}

/// Fetch a transcript, retrying transient failures with linear backoff.
///
/// `attempts` counts the first try; the wait before retry `n` is
/// `backoff * n`. Permanent failures return immediately.
pub async fn fetch_with_retry(
    fetcher: &dyn TranscriptFetcher,
    youtube_id: &str,
    attempts: u32,
    backoff: Duration,
) -> Result<Vec<Segment>> {
    let attempts = attempts.max(1);
    let mut last_err: Option<Error> = None;

    for attempt in 1..=attempts {
        match fetcher.fetch(youtube_id).await {
            Ok(segments) => return Ok(segments),
            Err(e) if !e.is_retryable_fetch() => return Err(e),
            Err(e) => {
                warn!(
                    video = youtube_id,
                    "Transcript attempt {}/{} failed: {}", attempt, attempts, e
                );
                last_err = Some(e);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(backoff * attempt).await;
        }
    }

    Err(last_err.unwrap_or_else(|| Error::TranscriptFetch {
        video: youtube_id.to_string(),
        reason: "no attempts made".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyFetcher {
        calls: AtomicU32,
        succeed_on: u32,
        permanent: bool,
    }

    #[async_trait]
    impl TranscriptFetcher for FlakyFetcher {
        async fn fetch(&self, youtube_id: &str) -> Result<Vec<Segment>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.permanent {
                return Err(classify_failure(
                    youtube_id,
                    "Subtitles are disabled for this video".to_string(),
                ));
            }
            if call >= self.succeed_on {
                Ok(vec![Segment::new("ok", 0.0, 1.0)])
            } else {
                Err(classify_failure(youtube_id, "connection reset".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let fetcher = FlakyFetcher {
            calls: AtomicU32::new(0),
            succeed_on: 3,
            permanent: false,
        };
        let segments = fetch_with_retry(&fetcher, "abc", 3, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let fetcher = FlakyFetcher {
            calls: AtomicU32::new(0),
            succeed_on: 10,
            permanent: false,
        };
        let result = fetch_with_retry(&fetcher, "abc", 3, Duration::from_millis(1)).await;
        assert!(matches!(result, Err(Error::TranscriptFetch { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disabled_captions_are_not_retried() {
        let fetcher = FlakyFetcher {
            calls: AtomicU32::new(0),
            succeed_on: 1,
            permanent: true,
        };
        let result = fetch_with_retry(&fetcher, "abc", 3, Duration::from_millis(1)).await;
        assert!(matches!(result, Err(Error::TranscriptUnavailable { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("x", "The video is unavailable".to_string()),
            Error::TranscriptUnavailable { .. }
        ));
        assert!(matches!(
            classify_failure("x", "timed out".to_string()),
            Error::TranscriptFetch { .. }
        ));
    }
}
