//! Transcript segments and fetching
//!
//! A transcript is an ordered list of caption segments. Different sources
//! report offsets in different units, so conversion to [`Segment`] always
//! names the unit explicitly.

mod fetch;
mod file;

pub use fetch::*;
pub use file::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// A caption segment, times in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

impl Segment {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// End of the segment in seconds
    pub fn end(&self) -> f64 {
        self.start + self.duration.max(0.0)
    }
}

/// Unit of the offsets in a raw transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    fn to_seconds(self, value: f64) -> f64 {
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Milliseconds => value / 1000.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "s" | "sec" | "secs" | "seconds" => Ok(TimeUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            _ => Err(Error::Parse(format!("Unknown time unit: {}", s))),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Seconds => write!(f, "s"),
            TimeUnit::Milliseconds => write!(f, "ms"),
        }
    }
}

/// A segment as found in exported transcript JSON.
///
/// Accepts both `offset` and `start` for the start time; numbers may be
/// encoded as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    pub text: String,
    #[serde(alias = "start", alias = "startTime", deserialize_with = "de_number")]
    pub offset: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub duration: f64,
}

impl RawSegment {
    pub fn into_segment(self, unit: TimeUnit) -> Segment {
        Segment {
            text: self.text,
            start: unit.to_seconds(self.offset),
            duration: unit.to_seconds(self.duration),
        }
    }
}

fn de_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("number out of range")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| D::Error::custom(format!("invalid number '{}': {}", s, e))),
        serde_json::Value::Null => Ok(0.0),
        other => Err(D::Error::custom(format!("expected number, got {}", other))),
    }
}

/// Convert raw segments, sort them by start and drop empty captions
pub fn normalize_segments(raw: Vec<RawSegment>, unit: TimeUnit) -> Vec<Segment> {
    let mut segments: Vec<Segment> = raw
        .into_iter()
        .map(|r| r.into_segment(unit))
        .map(|mut s| {
            s.text = clean_caption(&s.text);
            s
        })
        .filter(|s| !s.text.is_empty())
        .collect();
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    segments
}

/// Collapse whitespace and decode the entities caption feeds leave behind
pub fn clean_caption(text: &str) -> String {
    let decoded = text
        .replace("&amp;#39;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Segments from transcript JSON: either a bare array of segments or an
/// object with a `transcript`/`segments`/`full_transcript` array.
pub fn segments_from_value(value: serde_json::Value, unit: TimeUnit) -> Result<Vec<Segment>> {
    let array = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut map) => ["transcript", "segments", "full_transcript"]
            .iter()
            .find_map(|key| map.remove(*key))
            .ok_or_else(|| {
                Error::Parse("no transcript, segments or full_transcript array".to_string())
            })?,
        serde_json::Value::String(_) => {
            return Err(Error::Parse("transcript is plain text without timings".to_string()))
        }
        _ => return Err(Error::Parse("not a transcript array".to_string())),
    };

    let raw: Vec<RawSegment> = serde_json::from_value(array)?;
    Ok(normalize_segments(raw, unit))
}

/// Load a transcript JSON file, see [`segments_from_value`]
pub fn load_transcript_file(path: &Path, unit: TimeUnit) -> Result<Vec<Segment>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    segments_from_value(value, unit).map_err(|e| match e {
        Error::Parse(reason) => Error::Parse(format!("{}: {}", path.display(), reason)),
        other => other,
    })
}

/// Join all segment texts into one string
pub fn full_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_millisecond_offsets_are_converted() {
        let raw: Vec<RawSegment> = serde_json::from_str(
            r#"[{"text":"hello","offset":1500,"duration":2000},{"text":"world","offset":"3500","duration":"500"}]"#,
        )
        .unwrap();

        let segments = normalize_segments(raw, TimeUnit::Milliseconds);
        assert_eq!(segments[0], Segment::new("hello", 1.5, 2.0));
        assert_eq!(segments[1], Segment::new("world", 3.5, 0.5));
    }

    #[test]
    fn test_start_alias_and_sorting() {
        let raw: Vec<RawSegment> = serde_json::from_str(
            r#"[{"text":"b","start":5.0,"duration":1.0},{"text":"a","start":1.0}]"#,
        )
        .unwrap();

        let segments = normalize_segments(raw, TimeUnit::Seconds);
        assert_eq!(segments[0].text, "a");
        assert_eq!(segments[0].duration, 0.0);
        assert_eq!(segments[1].text, "b");
    }

    #[test]
    fn test_empty_captions_are_dropped() {
        let raw: Vec<RawSegment> = serde_json::from_str(
            r#"[{"text":"  ","offset":0,"duration":1},{"text":"[Music]\n  intro","offset":1,"duration":1}]"#,
        )
        .unwrap();

        let segments = normalize_segments(raw, TimeUnit::Seconds);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "[Music] intro");
    }

    #[test]
    fn test_clean_caption_entities() {
        assert_eq!(clean_caption("it&amp;#39;s &quot;fine&quot;"), "it's \"fine\"");
    }

    #[test]
    fn test_time_unit_parse() {
        assert_eq!("ms".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert_eq!("seconds".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert!("minutes".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_load_wrapped_transcript_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.json");
        std::fs::write(
            &path,
            r#"{"youtubeId":"abc","transcript":[{"text":"hi","offset":0,"duration":1000}]}"#,
        )
        .unwrap();

        let segments = load_transcript_file(&path, TimeUnit::Milliseconds).unwrap();
        assert_eq!(segments, vec![Segment::new("hi", 0.0, 1.0)]);
    }

    #[test]
    fn test_plain_text_body_is_rejected() {
        let result = segments_from_value(serde_json::json!("just words"), TimeUnit::Seconds);
        assert!(matches!(result, Err(Error::Parse(_))));

        let stored = serde_json::json!([{"text": "a", "start": 2.0, "duration": 1.5}]);
        let segments = segments_from_value(stored, TimeUnit::Seconds).unwrap();
        assert_eq!(segments, vec![Segment::new("a", 2.0, 1.5)]);
    }

    #[test]
    fn test_full_text_joins_with_spaces() {
        let segments = vec![Segment::new("one", 0.0, 1.0), Segment::new("two", 1.0, 1.0)];
        assert_eq!(full_text(&segments), "one two");
    }
}
