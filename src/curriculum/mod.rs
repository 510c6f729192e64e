//! The curriculum data file
//!
//! Modules own weeks, weeks own days, days own an ordered list of videos.
//! Unknown fields are kept on every level so that a load followed by a save
//! only rewrites what was changed.

mod backup;
mod fix_ids;
mod markdown;
mod playlist;
mod validate;
mod video_id;

pub use backup::*;
pub use fix_ids::*;
pub use markdown::*;
pub use playlist::*;
pub use validate::*;
pub use video_id::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;
use tracing::debug;

/// YouTube id of a video that has not been found yet
pub const PLACEHOLDER_ID: &str = "YOUTUBE_ID_PLACEHOLDER";

/// Thumbnail used for placeholder videos
pub const PLACEHOLDER_THUMBNAIL: &str = "/images/placeholder-thumbnail.jpg";

/// XP awarded when a video does not say
pub const DEFAULT_XP: i64 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub modules: Vec<Module>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hours: Option<Number>,
    #[serde(default, rename = "totalXP", skip_serializing_if = "Option::is_none")]
    pub total_xp: Option<Number>,
    #[serde(default)]
    pub weeks: Vec<Week>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub days: Vec<Day>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub youtube_id: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_reward: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_substitute: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VideoSource>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where an imported video came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    pub playlist_id: String,
    pub position: u32,
}

impl Video {
    /// A video with just the required fields set
    pub fn new(id: impl Into<String>, title: impl Into<String>, youtube_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            youtube_id: youtube_id.into(),
            creator: String::new(),
            duration: None,
            xp_reward: None,
            thumbnail: None,
            is_substitute: None,
            substitute_reason: None,
            placeholder: None,
            source: None,
            extra: Map::new(),
        }
    }

    /// Whether this entry still waits for a real YouTube video
    pub fn is_placeholder(&self) -> bool {
        self.placeholder == Some(true)
            || self.youtube_id.is_empty()
            || self.youtube_id == PLACEHOLDER_ID
            || self.youtube_id.starts_with("placeholder")
    }

    pub fn is_substitute(&self) -> bool {
        self.is_substitute == Some(true)
    }

    /// XP reward, falling back to the default
    pub fn xp(&self) -> i64 {
        self.xp_reward
            .as_ref()
            .and_then(number_as_i64)
            .unwrap_or(DEFAULT_XP)
    }
}

fn number_as_i64(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64))
}

/// Standard thumbnail URL for a YouTube id
pub fn thumbnail_url(youtube_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", youtube_id)
}

/// A video together with its place in the curriculum
#[derive(Debug, Clone, Copy)]
pub struct VideoRef<'a> {
    pub module: &'a Module,
    pub week: &'a Week,
    pub day: &'a Day,
    pub video: &'a Video,
    /// 1-based position
    pub position: VideoPosition,
}

impl VideoRef<'_> {
    /// Sequential day number used by the search checkpoint
    pub fn day_number(&self) -> u32 {
        self.position.day_number()
    }

    /// `Module 1, Week 2, Day 3, Video 4`
    pub fn location(&self) -> String {
        format!(
            "Module {}, Week {}, Day {}, Video {}",
            self.position.module, self.position.week, self.position.day, self.position.index
        )
    }
}

/// Curriculum totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumStats {
    pub modules: usize,
    pub weeks: usize,
    pub days: usize,
    pub videos: usize,
    pub placeholders: usize,
    pub substitutes: usize,
    #[serde(rename = "totalXP")]
    pub total_xp: f64,
    pub total_hours: f64,
}

impl CurriculumStats {
    /// Count from untyped JSON, tolerating missing or malformed levels
    pub fn from_value(value: &Value) -> Self {
        let mut stats = Self::default();
        let empty = Vec::new();
        let list = |v: &Value, key: &str| -> Vec<Value> {
            v.get(key).and_then(Value::as_array).cloned().unwrap_or_default()
        };

        let modules = value.get("modules").and_then(Value::as_array).unwrap_or(&empty);
        for module in modules {
            stats.modules += 1;
            stats.total_hours += module.get("totalHours").and_then(Value::as_f64).unwrap_or(0.0);
            stats.total_xp += module.get("totalXP").and_then(Value::as_f64).unwrap_or(0.0);

            for week in list(module, "weeks") {
                stats.weeks += 1;
                for day in list(&week, "days") {
                    stats.days += 1;
                    for video in list(&day, "videos") {
                        stats.videos += 1;
                        if video.get("youtubeId").and_then(Value::as_str) == Some(PLACEHOLDER_ID) {
                            stats.placeholders += 1;
                        }
                        if video.get("isSubstitute").and_then(Value::as_bool) == Some(true) {
                            stats.substitutes += 1;
                        }
                    }
                }
            }
        }

        stats
    }
}

impl Curriculum {
    /// Read and parse a curriculum file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading curriculum from {:?}", path);
        if !path.exists() {
            return Err(Error::Curriculum(format!(
                "Curriculum file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Curriculum(format!("Failed to parse curriculum: {}", e)))
    }

    /// Pretty JSON (2-space indent) with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Write the curriculum through a temp file and rename
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_json()?)?;
        debug!("Saved curriculum to {:?}", path);
        Ok(())
    }

    pub fn find_module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    pub fn find_module_mut(&mut self, module_id: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id == module_id)
    }

    pub fn find_week(&self, module_id: &str, week_id: &str) -> Option<&Week> {
        self.find_module(module_id)?
            .weeks
            .iter()
            .find(|w| w.id == week_id)
    }

    pub fn find_week_mut(&mut self, module_id: &str, week_id: &str) -> Option<&mut Week> {
        self.find_module_mut(module_id)?
            .weeks
            .iter_mut()
            .find(|w| w.id == week_id)
    }

    pub fn find_day(&self, module_id: &str, week_id: &str, day_id: &str) -> Option<&Day> {
        self.find_week(module_id, week_id)?
            .days
            .iter()
            .find(|d| d.id == day_id)
    }

    pub fn find_day_mut(&mut self, module_id: &str, week_id: &str, day_id: &str) -> Option<&mut Day> {
        self.find_week_mut(module_id, week_id)?
            .days
            .iter_mut()
            .find(|d| d.id == day_id)
    }

    /// 1-based module and week positions for a pair of ids
    pub fn week_position(&self, module_id: &str, week_id: &str) -> Option<(u32, u32)> {
        let (m, module) = self
            .modules
            .iter()
            .enumerate()
            .find(|(_, m)| m.id == module_id)?;
        let w = module.weeks.iter().position(|w| w.id == week_id)?;
        Some((m as u32 + 1, w as u32 + 1))
    }

    /// Replace the video list of one day
    pub fn set_day_videos(
        &mut self,
        module_id: &str,
        week_id: &str,
        day_id: &str,
        videos: Vec<Video>,
    ) -> Result<()> {
        let day = self.find_day_mut(module_id, week_id, day_id).ok_or_else(|| {
            Error::Curriculum(format!(
                "Day not found: {} / {} / {}",
                module_id, week_id, day_id
            ))
        })?;
        day.videos = videos;
        Ok(())
    }

    /// Every video in curriculum order
    pub fn videos(&self) -> impl Iterator<Item = VideoRef<'_>> {
        self.modules.iter().enumerate().flat_map(|(m, module)| {
            module.weeks.iter().enumerate().flat_map(move |(w, week)| {
                week.days.iter().enumerate().flat_map(move |(d, day)| {
                    day.videos.iter().enumerate().map(move |(i, video)| VideoRef {
                        module,
                        week,
                        day,
                        video,
                        position: VideoPosition::new(
                            m as u32 + 1,
                            w as u32 + 1,
                            d as u32 + 1,
                            i as u32 + 1,
                        ),
                    })
                })
            })
        })
    }

    pub fn stats(&self) -> CurriculumStats {
        let mut stats = CurriculumStats {
            modules: self.modules.len(),
            ..Default::default()
        };

        for module in &self.modules {
            stats.total_hours += module.total_hours.as_ref().and_then(Number::as_f64).unwrap_or(0.0);
            stats.total_xp += module.total_xp.as_ref().and_then(Number::as_f64).unwrap_or(0.0);
            stats.weeks += module.weeks.len();
            stats.days += module.weeks.iter().map(|w| w.days.len()).sum::<usize>();
        }

        for item in self.videos() {
            stats.videos += 1;
            if item.video.youtube_id == PLACEHOLDER_ID {
                stats.placeholders += 1;
            }
            if item.video.is_substitute() {
                stats.substitutes += 1;
            }
        }

        stats
    }
}

/// Write a file via a sibling temp file so readers never see a partial write
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
