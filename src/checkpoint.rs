//! Resume point for the YouTube search
//!
//! The checkpoint file is plain JSON so a long search can be stopped (or run
//! into the daily API quota) and picked up again on the next run.

use crate::curriculum::write_atomic;
use crate::error::Result;
use crate::youtube::{Confidence, ScoredMatch, VideoDetails};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A search result chosen for a curriculum video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundVideo {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    /// ISO 8601 as returned by `videos.list`
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub view_count: Option<String>,
    pub confidence: Confidence,
    pub search_score: i32,
    pub original_title: String,
    pub original_creator: String,
}

impl FoundVideo {
    pub fn new(
        scored: &ScoredMatch,
        details: Option<&VideoDetails>,
        original_title: &str,
        original_creator: &str,
    ) -> Self {
        Self {
            video_id: scored.hit.video_id.clone(),
            title: scored.hit.title.clone(),
            channel_title: scored.hit.channel_title.clone(),
            duration: details.map(|d| d.duration.clone()),
            view_count: details.and_then(|d| d.view_count.clone()),
            confidence: scored.confidence,
            search_score: scored.score,
            original_title: original_title.to_string(),
            original_creator: original_creator.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCheckpoint {
    #[serde(default)]
    pub last_searched_day: u32,
    #[serde(default)]
    pub total_searched: u64,
    #[serde(default)]
    pub total_found: u64,
    /// `day-N` -> searched
    #[serde(default)]
    pub search_history: BTreeMap<String, bool>,
    /// `day-N` -> videos found that day
    #[serde(default)]
    pub found_videos: BTreeMap<String, Vec<FoundVideo>>,
    #[serde(default)]
    pub last_run_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub quota_exceeded_at: Option<DateTime<Utc>>,
}

/// Checkpoint key for a day number
pub fn day_key(day_number: u32) -> String {
    format!("day-{}", day_number)
}

/// `youtube-videos-found-YYYY-MM-DD.json`
pub fn found_videos_file_name(date: NaiveDate) -> String {
    format!("youtube-videos-found-{}.json", date.format("%Y-%m-%d"))
}

impl SearchCheckpoint {
    /// Load the checkpoint, or start fresh when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No checkpoint at {:?}, starting fresh", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        write_atomic(path, &out)?;
        debug!("Saved checkpoint to {:?}", path);
        Ok(())
    }

    /// Time left before the quota is expected to reset, if still cooling down
    pub fn quota_cooldown_remaining(&self, now: DateTime<Utc>, cooldown_hours: i64) -> Option<Duration> {
        let exceeded = self.quota_exceeded_at?;
        let ready_at = exceeded + Duration::hours(cooldown_hours.clamp(0, 24 * 365));
        (now < ready_at).then(|| ready_at - now)
    }

    /// Whether a day was finished in an earlier run
    pub fn is_day_done(&self, day_number: u32) -> bool {
        day_number <= self.last_searched_day
            || self
                .search_history
                .get(&day_key(day_number))
                .copied()
                .unwrap_or(false)
    }

    /// Note that a run is active without counting anything
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_run_date = Some(now);
    }

    /// Mark a day as fully searched, storing whatever was found.
    ///
    /// Totals only move here: a day cut short by the quota is searched again
    /// from scratch and must not be counted twice.
    pub fn record_day(
        &mut self,
        day_number: u32,
        searched: u64,
        videos: Vec<FoundVideo>,
        now: DateTime<Utc>,
    ) {
        let key = day_key(day_number);
        self.total_searched += searched;
        self.total_found += videos.len() as u64;
        self.last_run_date = Some(now);
        if !videos.is_empty() {
            self.found_videos.insert(key.clone(), videos);
        }
        self.search_history.insert(key, true);
        self.last_searched_day = self.last_searched_day.max(day_number);
    }

    pub fn mark_quota_exceeded(&mut self, now: DateTime<Utc>) {
        self.quota_exceeded_at = Some(now);
    }

    /// Start over, keeping nothing
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn found(id: &str) -> FoundVideo {
        FoundVideo {
            video_id: id.to_string(),
            title: "Roblox Studio Basics".to_string(),
            channel_title: "BloxDev".to_string(),
            duration: Some("PT12M".to_string()),
            view_count: Some("1000".to_string()),
            confidence: Confidence::High,
            search_score: 12,
            original_title: "Studio Basics".to_string(),
            original_creator: "BloxDev".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_fresh() {
        let tmp = TempDir::new().unwrap();
        let cp = SearchCheckpoint::load_or_default(&tmp.path().join("cp.json")).unwrap();
        assert_eq!(cp, SearchCheckpoint::default());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cp.json");
        let now = Utc.with_ymd_and_hms(2025, 8, 27, 9, 0, 0).unwrap();

        let mut cp = SearchCheckpoint::default();
        cp.record_day(3, 2, vec![found("dQw4w9WgXcQ")], now);
        cp.save(&path).unwrap();

        let loaded = SearchCheckpoint::load_or_default(&path).unwrap();
        assert_eq!(loaded, cp);
        assert_eq!(loaded.total_searched, 2);
        assert_eq!(loaded.total_found, 1);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"lastSearchedDay\": 3"));
        assert!(raw.contains("\"day-3\""));
        assert!(raw.contains("\"confidence\": \"high\""));
    }

    #[test]
    fn test_reads_checkpoint_with_nulls() {
        let cp: SearchCheckpoint = serde_json::from_str(
            r#"{"lastSearchedDay": 0, "totalSearched": 0, "totalFound": 0,
                "searchHistory": {}, "foundVideos": {}, "lastRunDate": null,
                "quotaExceededAt": null}"#,
        )
        .unwrap();
        assert_eq!(cp, SearchCheckpoint::default());
    }

    #[test]
    fn test_day_progress() {
        let mut cp = SearchCheckpoint::default();
        assert!(!cp.is_day_done(1));

        cp.record_day(2, 1, Vec::new(), Utc::now());
        assert!(cp.is_day_done(1));
        assert!(cp.is_day_done(2));
        assert!(!cp.is_day_done(3));
        assert!(cp.found_videos.is_empty());
        assert_eq!(cp.search_history.get("day-2"), Some(&true));
        assert_eq!(cp.total_searched, 1);
        assert_eq!(cp.total_found, 0);
    }

    #[test]
    fn test_touch_leaves_totals() {
        let now = Utc.with_ymd_and_hms(2025, 8, 27, 9, 0, 0).unwrap();
        let mut cp = SearchCheckpoint::default();
        cp.touch(now);
        assert_eq!(cp.last_run_date, Some(now));
        assert_eq!(cp.total_searched, 0);
        assert_eq!(cp.total_found, 0);
    }

    #[test]
    fn test_quota_cooldown() {
        let exceeded = Utc.with_ymd_and_hms(2025, 8, 27, 9, 0, 0).unwrap();
        let mut cp = SearchCheckpoint::default();
        assert!(cp.quota_cooldown_remaining(exceeded, 24).is_none());

        cp.mark_quota_exceeded(exceeded);
        let later = exceeded + Duration::hours(20);
        assert_eq!(cp.quota_cooldown_remaining(later, 24), Some(Duration::hours(4)));
        assert!(cp
            .quota_cooldown_remaining(exceeded + Duration::hours(25), 24)
            .is_none());
    }

    #[test]
    fn test_found_videos_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 27).unwrap();
        assert_eq!(found_videos_file_name(date), "youtube-videos-found-2025-08-27.json");
    }
}
