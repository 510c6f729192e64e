use crate::error::{Error, Result};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// Position of a video, all parts 1-based. Formats as `video-m-w-d-i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoPosition {
    pub module: u32,
    pub week: u32,
    pub day: u32,
    pub index: u32,
}

impl VideoPosition {
    pub fn new(module: u32, week: u32, day: u32, index: u32) -> Self {
        Self {
            module,
            week,
            day,
            index,
        }
    }

    /// Sequential day number: 20 days per module, 5 per week
    pub fn day_number(&self) -> u32 {
        day_number(
            self.module.saturating_sub(1),
            self.week.saturating_sub(1),
            self.day.saturating_sub(1),
        )
    }
}

/// Day number from 0-based indices
pub fn day_number(module_index: u32, week_index: u32, day_index: u32) -> u32 {
    module_index * 20 + week_index * 5 + day_index + 1
}

impl std::fmt::Display for VideoPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "video-{}-{}-{}-{}",
            self.module, self.week, self.day, self.index
        )
    }
}

impl FromStr for VideoPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("video-")
            .ok_or_else(|| Error::InvalidVideoId(s.to_string()))?;
        let parts: Vec<u32> = rest
            .split('-')
            .map(|p| p.parse::<u32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| Error::InvalidVideoId(s.to_string()))?;

        match parts.as_slice() {
            [m, w, d, i] if [*m, *w, *d, *i].iter().all(|n| *n > 0) => {
                Ok(Self::new(*m, *w, *d, *i))
            }
            _ => Err(Error::InvalidVideoId(s.to_string())),
        }
    }
}

fn youtube_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").ok())
        .as_ref()
}

fn youtube_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/)([a-zA-Z0-9_-]{11})")
                .ok()
        })
        .as_ref()
}

/// Whether text is an 11-character YouTube video id
pub fn is_valid_youtube_id(text: &str) -> bool {
    youtube_id_pattern().is_some_and(|re| re.is_match(text))
}

/// Video id from a bare id or a watch/short/embed URL
pub fn extract_youtube_id(text: &str) -> Option<String> {
    let text = text.trim();
    if is_valid_youtube_id(text) {
        return Some(text.to_string());
    }
    youtube_url_pattern()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
