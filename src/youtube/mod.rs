//! YouTube Data API v3 client
//!
//! Covers the three endpoints the pipeline needs:
//! - `search.list` to find a video for a curriculum entry
//! - `videos.list` for durations and view counts
//! - `playlistItems.list` to import a playlist

mod duration;
mod scoring;

pub use duration::*;
pub use scoring::*;

use crate::config::YouTubeConfig;
use crate::error::{Error, Result};
use crate::throttle::QuotaLimiter;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// `videos.list` accepts at most this many ids per call
const MAX_IDS_PER_REQUEST: usize = 50;

/// Gaming
const SEARCH_CATEGORY_ID: &str = "20";

/// A `search.list` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub published_at: Option<String>,
}

/// A `videos.list` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub description: String,
    /// ISO 8601, e.g. `PT12M30S`
    pub duration: String,
    pub view_count: Option<String>,
    pub thumbnail: Option<String>,
}

impl VideoDetails {
    pub fn duration_seconds(&self) -> Option<u64> {
        parse_iso8601_duration(&self.duration)
    }
}

/// A `playlistItems.list` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub thumbnail: Option<String>,
    pub position: u32,
}

// Wire shapes

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Option<ApiThumbnails>,
    #[serde(default)]
    position: Option<u32>,
    #[serde(default)]
    resource_id: Option<ApiResourceId>,
}

#[derive(Debug, Deserialize)]
struct ApiThumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiThumbnails {
    maxres: Option<ApiThumbnail>,
    high: Option<ApiThumbnail>,
    medium: Option<ApiThumbnail>,
    default: Option<ApiThumbnail>,
}

impl ApiThumbnails {
    fn best(&self) -> Option<String> {
        [&self.maxres, &self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url.clone())
            .next()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResourceId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSearchItem {
    id: ApiResourceId,
    #[serde(default)]
    snippet: ApiSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVideoItem {
    id: String,
    #[serde(default)]
    snippet: ApiSnippet,
    #[serde(default)]
    content_details: Option<ApiContentDetails>,
    #[serde(default)]
    statistics: Option<ApiStatistics>,
}

#[derive(Debug, Deserialize)]
struct ApiContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiStatistics {
    #[serde(default)]
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylistItem {
    #[serde(default)]
    snippet: ApiSnippet,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Map an error response body to an error, detecting exhausted quota
fn classify_api_error(status: u16, body: &str) -> Error {
    let parsed: Option<ApiErrorEnvelope> = serde_json::from_str(body).ok();

    let quota_reason = parsed.as_ref().is_some_and(|env| {
        env.error
            .errors
            .iter()
            .any(|d| d.reason == "quotaExceeded" || d.reason == "dailyLimitExceeded")
    });
    let message = parsed
        .map(|env| env.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    if quota_reason || message.to_lowercase().contains("quota") {
        Error::QuotaExceeded
    } else {
        Error::YouTube(format!("HTTP {}: {}", status, message))
    }
}

/// YouTube Data API client
pub struct YouTubeClient {
    client: Client,
    base_url: Url,
    api_key: String,
    limiter: QuotaLimiter,
}

impl YouTubeClient {
    pub fn new(base_url: &str, api_key: String, requests_per_second: u32) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_key,
            limiter: QuotaLimiter::new(requests_per_second),
        })
    }

    pub fn from_config(config: &YouTubeConfig) -> Result<Self> {
        Self::new(&config.base_url, config.api_key()?, config.requests_per_second)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        self.limiter.wait().await;

        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| Error::Config(format!("Invalid YouTube base URL: {}", e)))?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status.as_u16(), &body));
        }

        Ok(response.json::<T>().await?)
    }

    /// Search videos by free text
    pub async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<SearchHit>> {
        let list: ApiList<ApiSearchItem> = self
            .get(
                "search",
                &[
                    ("part", "snippet".to_string()),
                    ("q", query.to_string()),
                    ("maxResults", max_results.to_string()),
                    ("type", "video".to_string()),
                    ("videoCategoryId", SEARCH_CATEGORY_ID.to_string()),
                    ("relevanceLanguage", "en".to_string()),
                ],
            )
            .await?;

        Ok(list
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                let thumbnail = item.snippet.thumbnails.as_ref().and_then(ApiThumbnails::best);
                Some(SearchHit {
                    video_id,
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                    description: item.snippet.description,
                    thumbnail,
                    published_at: item.snippet.published_at,
                })
            })
            .collect())
    }

    /// Details for many videos, fetched 50 ids per call
    pub async fn video_details(&self, ids: &[String]) -> Result<Vec<VideoDetails>> {
        let mut details = Vec::with_capacity(ids.len());

        for batch in ids.chunks(MAX_IDS_PER_REQUEST) {
            let list: ApiList<ApiVideoItem> = self
                .get(
                    "videos",
                    &[
                        ("part", "snippet,contentDetails,statistics".to_string()),
                        ("id", batch.join(",")),
                    ],
                )
                .await?;

            details.extend(list.items.into_iter().map(|item| {
                let thumbnail = item.snippet.thumbnails.as_ref().and_then(ApiThumbnails::best);
                VideoDetails {
                    id: item.id,
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                    description: item.snippet.description,
                    duration: item
                        .content_details
                        .map(|c| c.duration)
                        .unwrap_or_else(|| "PT0S".to_string()),
                    view_count: item.statistics.and_then(|s| s.view_count),
                    thumbnail,
                }
            }));
        }

        Ok(details)
    }

    /// Every item of a playlist, following page tokens
    pub async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "snippet".to_string()),
                ("maxResults", MAX_IDS_PER_REQUEST.to_string()),
                ("playlistId", playlist_id.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let list: ApiList<ApiPlaylistItem> = self.get("playlistItems", &params).await?;
            for item in list.items {
                let snippet = item.snippet;
                let Some(video_id) = snippet.resource_id.and_then(|r| r.video_id) else {
                    continue;
                };
                let thumbnail = snippet.thumbnails.as_ref().and_then(ApiThumbnails::best);
                items.push(PlaylistItem {
                    video_id,
                    title: snippet.title,
                    description: snippet.description,
                    channel_title: snippet.channel_title,
                    thumbnail,
                    position: snippet.position.unwrap_or(items.len() as u32),
                });
            }

            match list.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(playlist_id, count = items.len(), "Fetched playlist items");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> YouTubeClient {
        YouTubeClient::new(&format!("{}/youtube/v3", server.uri()), "yt-key".to_string(), 100)
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_videos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("q", "studio basics"))
            .and(query_param("key", "yt-key"))
            .and(query_param("type", "video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "id": {"kind": "youtube#video", "videoId": "abc123def45"},
                        "snippet": {
                            "title": "Studio Basics",
                            "channelTitle": "BloxDev",
                            "description": "d",
                            "thumbnails": {"high": {"url": "https://i.ytimg.com/hq.jpg"}}
                        }
                    },
                    {"id": {"kind": "youtube#channel", "channelId": "UC1"}, "snippet": {}}
                ]
            })))
            .mount(&server)
            .await;

        let hits = client(&server).search_videos("studio basics", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].video_id, "abc123def45");
        assert_eq!(hits[0].thumbnail.as_deref(), Some("https://i.ytimg.com/hq.jpg"));
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{"reason": "quotaExceeded", "domain": "youtube.quota"}]
                }
            })))
            .mount(&server)
            .await;

        let result = client(&server).search_videos("x", 5).await;
        assert!(matches!(result, Err(Error::QuotaExceeded)));
    }

    #[tokio::test]
    async fn test_other_errors_are_not_quota() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "Invalid id", "errors": [{"reason": "badRequest"}]}
            })))
            .mount(&server)
            .await;

        let result = client(&server).video_details(&["x".to_string()]).await;
        assert!(matches!(result, Err(Error::YouTube(msg)) if msg.contains("Invalid id")));
    }

    #[tokio::test]
    async fn test_video_details_batches_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "v1",
                    "snippet": {"title": "T", "channelTitle": "C"},
                    "contentDetails": {"duration": "PT4M2S"},
                    "statistics": {"viewCount": "1200"}
                }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let ids: Vec<String> = (0..75).map(|i| format!("id{}", i)).collect();
        let details = client(&server).video_details(&ids).await.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].duration_seconds(), Some(242));
        assert_eq!(details[0].view_count.as_deref(), Some("1200"));
    }

    #[tokio::test]
    async fn test_playlist_items_follow_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlistItems"))
            .and(query_param("pageToken", "P2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"snippet": {"title": "Second", "position": 1,
                    "resourceId": {"videoId": "vid2"}}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlistItems"))
            .and(query_param("playlistId", "PL1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"snippet": {"title": "First", "position": 0,
                    "resourceId": {"videoId": "vid1"}}}],
                "nextPageToken": "P2"
            })))
            .mount(&server)
            .await;

        let items = client(&server).playlist_items("PL1").await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.video_id.as_str()).collect();
        assert_eq!(ids, vec!["vid1", "vid2"]);
        assert_eq!(items[1].position, 1);
    }
}
