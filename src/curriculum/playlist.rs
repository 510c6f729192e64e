//! Importing a YouTube playlist into a curriculum week

use super::{thumbnail_url, write_atomic, Curriculum, Day, Video, VideoPosition, VideoSource};
use crate::error::{Error, Result};
use crate::youtube::{duration_minutes, format_duration, PlaylistItem, VideoDetails};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const DESCRIPTION_LIMIT: usize = 300;
const MIN_XP: u64 = 20;
const MAX_XP: u64 = 50;

/// Titles YouTube gives to entries whose video is gone
const UNAVAILABLE_TITLES: &[&str] = &["Deleted video", "Private video"];

/// A playlist entry merged with its video details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideo {
    pub youtube_id: String,
    pub title: String,
    pub creator: String,
    #[serde(default)]
    pub description: String,
    pub duration: String,
    pub total_minutes: u64,
    pub raw_duration: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub position: u32,
    pub xp_reward: u64,
}

/// What `playlist fetch` writes and `playlist apply` reads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistFile {
    pub playlist_id: String,
    #[serde(default)]
    pub fetched_at: Option<String>,
    pub videos: Vec<PlaylistVideo>,
}

impl PlaylistFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        write_atomic(path, &out)
    }
}

/// XP scales with length: half a point per minute, clamped to 20..=50
pub fn xp_for_minutes(minutes: u64) -> u64 {
    (minutes / 2).clamp(MIN_XP, MAX_XP)
}

fn truncate_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        text.to_string()
    } else {
        let cut: String = text.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{}...", cut)
    }
}

/// Merge playlist items with `videos.list` details, in playlist order.
///
/// Entries that were deleted or made private are dropped.
pub fn build_playlist_videos(items: &[PlaylistItem], details: &[VideoDetails]) -> Vec<PlaylistVideo> {
    let by_id: HashMap<&str, &VideoDetails> = details.iter().map(|d| (d.id.as_str(), d)).collect();

    items
        .iter()
        .filter_map(|item| {
            let detail = by_id.get(item.video_id.as_str()).copied();
            if detail.is_none() && UNAVAILABLE_TITLES.contains(&item.title.as_str()) {
                debug!("Skipping unavailable playlist entry {}", item.video_id);
                return None;
            }

            let raw_duration = detail
                .map(|d| d.duration.clone())
                .unwrap_or_else(|| "PT0S".to_string());
            let seconds = detail.and_then(VideoDetails::duration_seconds).unwrap_or(0);
            let total_minutes = duration_minutes(seconds);

            Some(PlaylistVideo {
                youtube_id: item.video_id.clone(),
                title: item.title.clone(),
                creator: item.channel_title.clone(),
                description: truncate_description(&item.description),
                duration: format_duration(seconds),
                total_minutes,
                raw_duration,
                thumbnail: item
                    .thumbnail
                    .clone()
                    .or_else(|| detail.and_then(|d| d.thumbnail.clone())),
                position: item.position,
                xp_reward: xp_for_minutes(total_minutes),
            })
        })
        .collect()
}

/// Where and how to place a playlist
#[derive(Debug, Clone)]
pub struct PlaylistPlan {
    pub playlist_id: String,
    pub module_id: String,
    pub week_id: String,
    /// 1-based day the first video lands on
    pub first_day: usize,
    pub per_day: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AssignSummary {
    /// `(day id, videos assigned)` in order
    pub days: Vec<(String, usize)>,
    pub created_days: usize,
    pub videos: usize,
}

fn format_minutes(minutes: u64) -> String {
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

fn playlist_entry(video: &PlaylistVideo, position: VideoPosition, playlist_id: &str) -> Video {
    let mut entry = Video::new(position.to_string(), video.title.clone(), video.youtube_id.clone());
    entry.creator = video.creator.clone();
    entry.duration = Some(video.duration.clone());
    entry.xp_reward = Some(Number::from(video.xp_reward));
    entry.thumbnail = Some(
        video
            .thumbnail
            .clone()
            .unwrap_or_else(|| thumbnail_url(&video.youtube_id)),
    );
    entry.source = Some(VideoSource {
        playlist_id: playlist_id.to_string(),
        position: video.position,
    });
    entry
}

/// Distribute playlist videos over consecutive days of a week.
///
/// Each touched day has its video list replaced; days past the end of the
/// week are created. Nothing time-dependent is written, so applying the
/// same playlist twice yields the same file.
pub fn assign_playlist(
    curriculum: &mut Curriculum,
    plan: &PlaylistPlan,
    videos: &[PlaylistVideo],
) -> Result<AssignSummary> {
    if plan.per_day == 0 {
        return Err(Error::Curriculum("Videos per day must be at least 1".to_string()));
    }
    if plan.first_day == 0 {
        return Err(Error::Curriculum("Days are numbered from 1".to_string()));
    }

    let (m, w) = curriculum
        .week_position(&plan.module_id, &plan.week_id)
        .ok_or_else(|| {
            Error::Curriculum(format!(
                "Week not found: {} / {}",
                plan.module_id, plan.week_id
            ))
        })?;
    let week = curriculum
        .find_week_mut(&plan.module_id, &plan.week_id)
        .ok_or_else(|| Error::Curriculum(format!("Week not found: {}", plan.week_id)))?;

    if plan.first_day > week.days.len() + 1 {
        return Err(Error::Curriculum(format!(
            "Day {} is past the end of {} ({} days)",
            plan.first_day,
            plan.week_id,
            week.days.len()
        )));
    }

    let mut summary = AssignSummary::default();

    for (offset, batch) in videos.chunks(plan.per_day).enumerate() {
        let day_index = plan.first_day - 1 + offset;
        if day_index >= week.days.len() {
            let n = day_index + 1;
            week.days.push(Day {
                id: format!("day-{}", n),
                title: format!("Day {}", n),
                videos: Vec::new(),
                practice_task: None,
                estimated_time: None,
                extra: Map::new(),
            });
            summary.created_days += 1;
        }

        let day = &mut week.days[day_index];
        day.videos = batch
            .iter()
            .enumerate()
            .map(|(i, video)| {
                let position = VideoPosition::new(m, w, day_index as u32 + 1, i as u32 + 1);
                playlist_entry(video, position, &plan.playlist_id)
            })
            .collect();
        day.estimated_time = Some(format_minutes(
            batch.iter().map(|v| v.total_minutes).sum(),
        ));

        summary.days.push((day.id.clone(), batch.len()));
        summary.videos += batch.len();
    }

    info!(
        "Assigned {} playlist videos to {} days of {}",
        summary.videos,
        summary.days.len(),
        plan.week_id
    );
    Ok(summary)
}
