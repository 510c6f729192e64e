//! Structural checks over the raw curriculum JSON
//!
//! Works on `serde_json::Value` rather than the typed structs so that
//! missing fields and wrong types are reported instead of failing to parse.

use super::PLACEHOLDER_ID;
use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// One error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub modules: usize,
    pub weeks: usize,
    pub days: usize,
    pub videos: usize,
    pub placeholders: usize,
    pub substitutes: usize,
    pub duplicate_ids: usize,
    #[serde(rename = "invalidYouTubeIds")]
    pub invalid_youtube_ids: usize,
    pub missing_thumbnails: usize,
}

impl ValidationStats {
    pub fn valid_videos(&self) -> usize {
        self.videos
            .saturating_sub(self.placeholders)
            .saturating_sub(self.invalid_youtube_ids)
    }

    pub fn average_videos_per_day(&self) -> f64 {
        if self.days == 0 {
            0.0
        } else {
            self.videos as f64 / self.days as f64
        }
    }
}

/// Result of validating one curriculum
#[derive(Debug, Clone, Default, Serialize)]
pub struct Validation {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub stats: ValidationStats,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum IdStatus {
    Valid,
    Placeholder,
    Invalid,
}

fn duration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?$").ok())
        .as_ref()
}

fn estimated_time_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+[hm]").ok()).as_ref()
}

/// Present and not empty, zero, false or null
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

fn id_status(youtube_id: Option<&Value>) -> IdStatus {
    match youtube_id.and_then(Value::as_str) {
        Some(PLACEHOLDER_ID) => IdStatus::Placeholder,
        Some(id) if super::is_valid_youtube_id(id) => IdStatus::Valid,
        _ => IdStatus::Invalid,
    }
}

fn matches(pattern: Option<&Regex>, text: &str) -> bool {
    pattern.is_some_and(|re| re.is_match(text))
}

impl Validation {
    /// Validate an already-parsed curriculum
    pub fn validate_value(curriculum: &Value) -> Self {
        let mut v = Self::default();
        v.check_curriculum(curriculum);
        v.check_duplicate_ids(curriculum);
        v
    }

    /// Validate a file. A file that cannot be parsed yields a failed
    /// validation rather than an error; a missing file is an error.
    pub fn validate_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Curriculum(format!(
                "Curriculum file not found: {}",
                path.display()
            )));
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str::<Value>(&content).map_err(|e| e.to_string()));

        Ok(match parsed {
            Ok(value) => Self::validate_value(&value),
            Err(reason) => {
                let mut v = Self::default();
                v.error(format!("Failed to read or parse curriculum file: {}", reason), None);
                v
            }
        })
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// No errors and no warnings
    pub fn passed(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    fn error(&mut self, message: impl Into<String>, location: Option<&str>) {
        self.errors.push(Issue {
            message: message.into(),
            location: location.map(str::to_string),
        });
    }

    fn warning(&mut self, message: impl Into<String>, location: &str) {
        self.warnings.push(Issue {
            message: message.into(),
            location: Some(location.to_string()),
        });
    }

    fn check_curriculum(&mut self, curriculum: &Value) {
        if curriculum.is_null() {
            self.error("Curriculum data is null or undefined", None);
            return;
        }

        let Some(modules) = curriculum.get("modules").and_then(Value::as_array) else {
            self.error("Curriculum missing or invalid modules array", None);
            return;
        };

        if modules.is_empty() {
            self.error("Curriculum has no modules", None);
            return;
        }

        for (m, module) in modules.iter().enumerate() {
            self.check_module(module, m);
        }
    }

    fn check_module(&mut self, module: &Value, m: usize) {
        let location = format!("Module {}", m + 1);
        let loc = Some(location.as_str());

        if !truthy(module.get("id")) {
            self.error("Module missing required field: id", loc);
        }
        if !truthy(module.get("title")) {
            self.error("Module missing required field: title", loc);
        }
        if !truthy(module.get("description")) {
            self.warning("Module missing description", &location);
        }
        if !module.get("totalHours").is_some_and(Value::is_number) {
            self.warning("Module missing or invalid totalHours", &location);
        }
        if !module.get("totalXP").is_some_and(Value::is_number) {
            self.warning("Module missing or invalid totalXP", &location);
        }

        match module.get("weeks").and_then(Value::as_array) {
            None => self.error("Module missing or invalid weeks array", loc),
            Some(weeks) => {
                if weeks.is_empty() {
                    self.error("Module has no weeks", loc);
                }
                for (w, week) in weeks.iter().enumerate() {
                    self.check_week(week, m, w);
                }
            }
        }

        self.stats.modules += 1;
    }

    fn check_week(&mut self, week: &Value, m: usize, w: usize) {
        let location = format!("Module {}, Week {}", m + 1, w + 1);
        let loc = Some(location.as_str());

        if !truthy(week.get("id")) {
            self.error("Week missing required field: id", loc);
        }
        if !truthy(week.get("title")) {
            self.error("Week missing required field: title", loc);
        }
        if !truthy(week.get("description")) {
            self.warning("Week missing description", &location);
        }

        match week.get("days").and_then(Value::as_array) {
            None => self.error("Week missing or invalid days array", loc),
            Some(days) => {
                if days.is_empty() {
                    self.error("Week has no days", loc);
                } else if days.len() > 7 {
                    self.warning("Week has more than 7 days", &location);
                }
                for (d, day) in days.iter().enumerate() {
                    self.check_day(day, m, w, d);
                }
            }
        }

        self.stats.weeks += 1;
    }

    fn check_day(&mut self, day: &Value, m: usize, w: usize, d: usize) {
        let location = format!("Module {}, Week {}, Day {}", m + 1, w + 1, d + 1);
        let loc = Some(location.as_str());

        if !truthy(day.get("id")) {
            self.error("Day missing required field: id", loc);
        }
        if !truthy(day.get("title")) {
            self.error("Day missing required field: title", loc);
        }

        match day.get("videos").and_then(Value::as_array) {
            None => self.error("Day missing or invalid videos array", loc),
            Some(videos) => {
                if videos.is_empty() {
                    self.warning("Day has no videos assigned", &location);
                } else if videos.len() > 10 {
                    self.warning("Day has many videos (>10) - consider splitting", &location);
                }
                for (i, video) in videos.iter().enumerate() {
                    self.check_video(video, &format!("{}, Video {}", location, i + 1));
                }
            }
        }

        if truthy(day.get("estimatedTime")) {
            let text = day.get("estimatedTime").and_then(Value::as_str).unwrap_or("");
            if !matches(estimated_time_pattern(), text) {
                self.warning(
                    "Estimated time format unclear (suggest: \"2h\" or \"30m\")",
                    &location,
                );
            }
        }

        self.stats.days += 1;
    }

    fn check_video(&mut self, video: &Value, location: &str) {
        let loc = Some(location);

        if !truthy(video.get("id")) {
            self.error("Video missing required field: id", loc);
        }

        match video.get("title") {
            title if !truthy(title) => self.error("Video missing required field: title", loc),
            Some(Value::String(title)) if title.chars().count() < 3 => {
                self.warning("Video title is very short", location)
            }
            _ => {}
        }

        if !truthy(video.get("creator")) {
            self.error("Video missing required field: creator", loc);
        }

        match id_status(video.get("youtubeId")) {
            IdStatus::Placeholder => {
                self.stats.placeholders += 1;
                self.warning("Video has placeholder YouTube ID", location);
            }
            IdStatus::Invalid => {
                self.stats.invalid_youtube_ids += 1;
                self.error("Invalid YouTube ID format", loc);
            }
            IdStatus::Valid => {}
        }

        let duration = video.get("duration").and_then(Value::as_str).unwrap_or("");
        if duration.is_empty() || !matches(duration_pattern(), duration) {
            self.warning("Invalid or missing duration format", location);
        }

        match video.get("xpReward").and_then(Value::as_f64) {
            Some(xp) if xp != 0.0 => {
                if !(1.0..=100.0).contains(&xp) {
                    self.warning("XP reward seems unusual (should be 1-100)", location);
                }
            }
            _ => self.warning("Invalid or missing XP reward", location),
        }

        if !truthy(video.get("thumbnail")) {
            self.stats.missing_thumbnails += 1;
            self.warning("Video missing thumbnail", location);
        }

        if truthy(video.get("isSubstitute")) {
            self.stats.substitutes += 1;
        }

        self.stats.videos += 1;
    }

    /// Ids must be unique across every level. Missing ids are already
    /// reported as errors and are not counted here.
    fn check_duplicate_ids(&mut self, curriculum: &Value) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut duplicates: HashSet<String> = HashSet::new();
        let mut found: Vec<(String, String)> = Vec::new();

        let mut check = |id: Option<&Value>, location: String| {
            let Some(id) = id.and_then(Value::as_str) else {
                return;
            };
            if !seen.insert(id.to_string()) {
                duplicates.insert(id.to_string());
                found.push((id.to_string(), location));
            }
        };

        let list = |v: &Value, key: &str| v.get(key).and_then(Value::as_array).cloned().unwrap_or_default();

        for (m, module) in list(curriculum, "modules").iter().enumerate() {
            check(module.get("id"), format!("Module {}", m + 1));
            for (w, week) in list(module, "weeks").iter().enumerate() {
                check(week.get("id"), format!("Module {}, Week {}", m + 1, w + 1));
                for (d, day) in list(week, "days").iter().enumerate() {
                    check(
                        day.get("id"),
                        format!("Module {}, Week {}, Day {}", m + 1, w + 1, d + 1),
                    );
                    for (i, video) in list(day, "videos").iter().enumerate() {
                        check(
                            video.get("id"),
                            format!(
                                "Module {}, Week {}, Day {}, Video {}",
                                m + 1,
                                w + 1,
                                d + 1,
                                i + 1
                            ),
                        );
                    }
                }
            }
        }

        for (id, location) in found {
            self.error(format!("Duplicate ID found: {}", id), Some(&location));
        }
        self.stats.duplicate_ids = duplicates.len();
    }

    /// Markdown report for a validated file
    pub fn report(&self, file_name: &str, date: DateTime<Utc>) -> String {
        let mut out: Vec<String> = Vec::new();
        let s = &self.stats;

        out.push("# 📋 Curriculum Validation Report".into());
        out.push(String::new());
        out.push(format!(
            "**Validation Date:** {}",
            date.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        out.push(format!("**File:** {}", file_name));
        out.push(String::new());

        if self.passed() {
            out.push("## ✅ Validation Status: PASSED".into());
            out.push("No errors or warnings found!".into());
        } else if !self.has_errors() {
            out.push("## ⚠️ Validation Status: WARNINGS".into());
            out.push("No critical errors, but some warnings to review.".into());
        } else {
            out.push("## ❌ Validation Status: FAILED".into());
            out.push("Critical errors found that need to be fixed.".into());
        }
        out.push(String::new());

        out.push("## 📊 Curriculum Statistics".into());
        out.push(String::new());
        out.push(format!("- **Modules:** {}", s.modules));
        out.push(format!("- **Weeks:** {}", s.weeks));
        out.push(format!("- **Days:** {}", s.days));
        out.push(format!("- **Total Videos:** {}", s.videos));
        out.push(format!("- **Valid Videos:** {}", s.valid_videos()));
        out.push(format!("- **Placeholder Videos:** {}", s.placeholders));
        out.push(format!("- **Substitute Videos:** {}", s.substitutes));
        out.push(format!("- **Invalid YouTube IDs:** {}", s.invalid_youtube_ids));
        out.push(format!("- **Missing Thumbnails:** {}", s.missing_thumbnails));
        out.push(format!("- **Duplicate IDs:** {}", s.duplicate_ids));
        out.push(String::new());

        for (heading, issues) in [("❌ Errors", &self.errors), ("⚠️ Warnings", &self.warnings)] {
            if issues.is_empty() {
                continue;
            }
            out.push(format!("## {} ({})", heading, issues.len()));
            out.push(String::new());
            for (n, issue) in issues.iter().enumerate() {
                out.push(format!("{}. **{}**", n + 1, issue.message));
                if let Some(location) = &issue.location {
                    out.push(format!("   📍 Location: {}", location));
                }
                out.push(String::new());
            }
        }

        out.push("## 💡 Recommendations".into());
        out.push(String::new());
        if s.placeholders > 0 {
            out.push(format!(
                "- Replace {} placeholder YouTube IDs with real video IDs",
                s.placeholders
            ));
        }
        if s.invalid_youtube_ids > 0 {
            out.push(format!("- Fix {} invalid YouTube ID formats", s.invalid_youtube_ids));
        }
        if s.duplicate_ids > 0 {
            out.push(format!("- Resolve {} duplicate ID conflicts", s.duplicate_ids));
        }
        if s.missing_thumbnails > 0 {
            out.push(format!("- Add thumbnail URLs for {} videos", s.missing_thumbnails));
        }
        let avg = s.average_videos_per_day();
        if avg > 5.0 {
            out.push(format!(
                "- Consider reducing video load per day (current avg: {:.1} videos/day)",
                avg
            ));
        }
        if self.passed() {
            out.push("- Curriculum structure looks great! 🎉".into());
            out.push("- Consider running `bloxbuddy coverage` to check transcript coverage".into());
        }

        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::tests::SAMPLE;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn messages(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn test_sample_has_only_warnings() {
        let value: Value = serde_json::from_str(SAMPLE).unwrap();
        let v = Validation::validate_value(&value);

        assert!(!v.has_errors(), "{:?}", v.errors);
        assert_eq!(v.stats.videos, 3);
        assert_eq!(v.stats.placeholders, 1);
        assert_eq!(v.stats.substitutes, 1);
        assert_eq!(v.stats.missing_thumbnails, 1);
        assert_eq!(v.stats.valid_videos(), 2);

        let warnings = messages(&v.warnings);
        assert!(warnings.contains(&"Video has placeholder YouTube ID"));
        assert!(warnings.contains(&"Video missing thumbnail"));
        assert_eq!(
            v.warnings[0].location.as_deref(),
            Some("Module 1, Week 1, Day 1, Video 2")
        );
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            messages(&Validation::validate_value(&Value::Null).errors),
            vec!["Curriculum data is null or undefined"]
        );
        assert_eq!(
            messages(&Validation::validate_value(&json!({"modules": []})).errors),
            vec!["Curriculum has no modules"]
        );
        assert_eq!(
            messages(&Validation::validate_value(&json!({})).errors),
            vec!["Curriculum missing or invalid modules array"]
        );

        let v = Validation::validate_value(&json!({
            "modules": [{"id": "m", "title": "M", "weeks": []}]
        }));
        assert_eq!(messages(&v.errors), vec!["Module has no weeks"]);
        assert!(messages(&v.warnings).contains(&"Module missing or invalid totalHours"));
    }

    #[test]
    fn test_video_rules() {
        let v = Validation::validate_value(&json!({
            "modules": [{
                "id": "m", "title": "M", "description": "d", "totalHours": 1, "totalXP": 1,
                "weeks": [{
                    "id": "w", "title": "W", "description": "d",
                    "days": [{
                        "id": "d", "title": "D", "estimatedTime": "a while",
                        "videos": [
                            {"id": "v1", "title": "ab", "creator": "c", "youtubeId": "bad",
                             "duration": "1:2", "xpReward": 500, "thumbnail": "t"},
                            {"id": "v2", "title": "Fine", "youtubeId": "dQw4w9WgXcQ",
                             "duration": "10:00", "xpReward": "20", "thumbnail": "t"}
                        ]
                    }]
                }]
            }]
        }));

        let errors = messages(&v.errors);
        assert!(errors.contains(&"Invalid YouTube ID format"));
        assert!(errors.contains(&"Video missing required field: creator"));
        assert_eq!(v.stats.invalid_youtube_ids, 1);

        let warnings = messages(&v.warnings);
        assert!(warnings.contains(&"Video title is very short"));
        assert!(warnings.contains(&"Invalid or missing duration format"));
        assert!(warnings.contains(&"XP reward seems unusual (should be 1-100)"));
        assert!(warnings.contains(&"Invalid or missing XP reward"));
        assert!(warnings.contains(&"Estimated time format unclear (suggest: \"2h\" or \"30m\")"));
    }

    #[test]
    fn test_duplicate_ids() {
        let video = json!({"id": "same", "title": "Title", "creator": "c",
            "youtubeId": "dQw4w9WgXcQ", "duration": "1:00", "xpReward": 20, "thumbnail": "t"});
        let v = Validation::validate_value(&json!({
            "modules": [{"id": "m", "title": "M", "weeks": [{"id": "w", "title": "W",
                "days": [{"id": "d", "title": "D", "videos": [video.clone(), video]}]}]}]
        }));
        assert_eq!(v.stats.duplicate_ids, 1);
        assert_eq!(v.errors.last().unwrap().message, "Duplicate ID found: same");
        assert_eq!(
            v.errors.last().unwrap().location.as_deref(),
            Some("Module 1, Week 1, Day 1, Video 2")
        );
    }

    #[test]
    fn test_unparseable_file_is_a_failed_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("curriculum.json");
        std::fs::write(&path, "{ not json").unwrap();

        let v = Validation::validate_file(&path).unwrap();
        assert!(v.has_errors());
        assert!(v.errors[0]
            .message
            .starts_with("Failed to read or parse curriculum file:"));

        assert!(Validation::validate_file(&tmp.path().join("none.json")).is_err());
    }

    #[test]
    fn test_report_layout() {
        let value: Value = serde_json::from_str(SAMPLE).unwrap();
        let v = Validation::validate_value(&value);
        let date = Utc.with_ymd_and_hms(2025, 8, 27, 12, 0, 0).unwrap();
        let report = v.report("curriculum.json", date);

        assert!(report.starts_with("# 📋 Curriculum Validation Report\n\n**Validation Date:** 2025-08-27T12:00:00.000Z\n**File:** curriculum.json"));
        assert!(report.contains("## ⚠️ Validation Status: WARNINGS"));
        assert!(report.contains("- **Valid Videos:** 2"));
        assert!(report.contains("   📍 Location: Module 1, Week 1, Day 1, Video 2"));
        assert!(report.contains("- Replace 1 placeholder YouTube IDs with real video IDs"));
        assert!(!report.contains("## ❌ Errors"));
    }
}
