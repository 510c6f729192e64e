//! Editable Markdown form of the curriculum
//!
//! Export renders every day as a table of videos; import parses the same
//! layout back, regenerating all ids from positions.

use super::{
    extract_youtube_id, thumbnail_url, Curriculum, Day, Module, Video, VideoPosition, Week,
    DEFAULT_XP, PLACEHOLDER_ID, PLACEHOLDER_THUMBNAIL,
};
use crate::chunk::parse_duration;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number};
use std::fmt::Write as _;

const TABLE_HEADER: &str = "| # | Title | Creator | Duration | XP | YouTube ID | Status |";
const TABLE_SEPARATOR: &str = "|---|-------|---------|----------|----|-----------:|--------|";
const MISSING_ID: &str = "(missing)";
const UNKNOWN_CREATOR: &str = "(unknown)";
const DEFAULT_DURATION: &str = "10:00";
const DEFAULT_MODULE_HOURS: i64 = 50;
const DEFAULT_MODULE_XP: i64 = 750;

/// Table status marker for a video
pub fn video_status(video: &Video) -> &'static str {
    if video.youtube_id == PLACEHOLDER_ID {
        "❌"
    } else if video
        .thumbnail
        .as_deref()
        .is_some_and(|t| t.contains("placeholder"))
    {
        "⚠️"
    } else if video.is_substitute() {
        "🔄"
    } else {
        "✅"
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn number_or_tbd(n: Option<&Number>) -> String {
    match n.and_then(Number::as_f64) {
        Some(v) if v != 0.0 => format_number(v),
        _ => "TBD".to_string(),
    }
}

fn video_row(video: &Video, index: usize) -> String {
    let youtube_id = if video.youtube_id == PLACEHOLDER_ID {
        MISSING_ID
    } else {
        video.youtube_id.as_str()
    };
    let creator = if video.creator.is_empty() {
        UNKNOWN_CREATOR
    } else {
        video.creator.as_str()
    };
    let duration = video
        .duration
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or("N/A");

    format!(
        "| {} | {} | {} | {} | {} | {} | {} |",
        index + 1,
        escape_cell(&video.title),
        escape_cell(creator),
        duration,
        video.xp(),
        youtube_id,
        video_status(video)
    )
}

fn videos_xp(videos: &[Video]) -> i64 {
    videos.iter().map(Video::xp).sum()
}

/// `1h 5m` or `45m` for the summed video durations
fn total_time(videos: &[Video]) -> String {
    let seconds: u64 = videos
        .iter()
        .filter_map(|v| v.duration.as_deref().and_then(parse_duration))
        .sum();
    let minutes = seconds / 60;
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

/// Render a curriculum as editable Markdown
pub fn export_markdown(curriculum: &Curriculum, generated_at: DateTime<Utc>) -> String {
    let mut md = String::new();

    md.push_str("# Blox Buddy Learning Curriculum\n\n");
    md.push_str("> **Generated from:** `curriculum.json`\n");
    let _ = writeln!(
        md,
        "> **Generated on:** {}",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    md.push_str("> **Status Legend:** ✅ Valid | ⚠️ Needs Review | ❌ Missing | 🔄 Substitute\n\n");

    let stats = curriculum.stats();
    let total_xp: i64 = curriculum.videos().map(|v| v.video.xp()).sum();
    md.push_str("## 📊 Curriculum Overview\n\n");
    let _ = writeln!(md, "- **Total Modules:** {}", stats.modules);
    let _ = writeln!(md, "- **Total Videos:** {}", stats.videos);
    let _ = writeln!(md, "- **Total XP:** {}", total_xp);
    let _ = writeln!(md, "- **Estimated Hours:** {}\n", format_number(stats.total_hours));
    md.push_str("---\n\n");

    for module in &curriculum.modules {
        let _ = writeln!(md, "# 📚 {}\n", module.title);
        let _ = writeln!(md, "**Description:** {}\n", module.description);
        md.push_str("**Module Stats:**\n");
        let _ = writeln!(md, "- Total Hours: {}", number_or_tbd(module.total_hours.as_ref()));
        let _ = writeln!(md, "- Total XP: {}", number_or_tbd(module.total_xp.as_ref()));
        let _ = writeln!(md, "- Weeks: {}\n", module.weeks.len());

        for (w, week) in module.weeks.iter().enumerate() {
            let _ = writeln!(md, "## 📅 {}\n", week.title);
            let _ = writeln!(md, "> {}\n", week.description);

            let week_videos: usize = week.days.iter().map(|d| d.videos.len()).sum();
            let week_xp: i64 = week.days.iter().map(|d| videos_xp(&d.videos)).sum();
            let _ = writeln!(
                md,
                "**Week {} Stats:** {} videos | {} XP\n",
                w + 1,
                week_videos,
                week_xp
            );

            for (d, day) in week.days.iter().enumerate() {
                let _ = writeln!(md, "### 🎯 {}\n", day.title);
                if let Some(task) = day.practice_task.as_deref().filter(|t| !t.is_empty()) {
                    let _ = writeln!(md, "**Practice Task:** {}\n", task);
                }
                if let Some(time) = day.estimated_time.as_deref().filter(|t| !t.is_empty()) {
                    let _ = writeln!(md, "**Estimated Time:** {}\n", time);
                }
                let _ = writeln!(
                    md,
                    "**Day {} Summary:** {} videos | {} XP | ~{}\n",
                    d + 1,
                    day.videos.len(),
                    videos_xp(&day.videos),
                    total_time(&day.videos)
                );

                if day.videos.is_empty() {
                    md.push_str("*No videos assigned to this day.*\n\n");
                } else {
                    md.push_str(TABLE_HEADER);
                    md.push('\n');
                    md.push_str(TABLE_SEPARATOR);
                    md.push('\n');
                    for (i, video) in day.videos.iter().enumerate() {
                        md.push_str(&video_row(video, i));
                        md.push('\n');
                    }
                    md.push('\n');
                }
                md.push_str("---\n\n");
            }
        }
        md.push('\n');
    }

    md.push_str("## 🔧 How to Edit This File\n\n");
    md.push_str("1. **Edit videos:** Modify the table rows directly\n");
    md.push_str("2. **Add videos:** Add new rows to any table\n");
    md.push_str("3. **Remove videos:** Delete table rows\n");
    md.push_str("4. **Change order:** Move table rows up/down\n");
    md.push_str("5. **Update YouTube IDs:** Replace the ID in the YouTube ID column\n");
    md.push_str("6. **Convert back:** Run `bloxbuddy curriculum import` to update curriculum.json\n\n");
    md.push_str("**⚠️ Important Notes:**\n");
    md.push_str("- Keep table formatting intact (pipes and alignment)\n");
    md.push_str("- Don't change the `# | Title | Creator` headers\n");
    md.push_str("- YouTube IDs should be 11 characters (e.g., `dQw4w9WgXcQ`)\n");
    md.push_str("- XP rewards should be numbers\n");
    md.push_str("- Duration format: `MM:SS` or `HH:MM:SS`\n\n");

    md
}

/// Curriculum parsed from Markdown plus any rows that had to be skipped
#[derive(Debug, Clone)]
pub struct MarkdownImport {
    pub curriculum: Curriculum,
    pub warnings: Vec<String>,
}

/// Split a table row on unescaped pipes
fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

/// Leading integer of a cell, like `25 XP` -> 25
fn leading_int(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_video_row(line: &str, position: VideoPosition) -> Result<Video, String> {
    let cells = split_row(line);
    if cells.len() < 6 {
        return Err(format!("Invalid video row format: {}", line));
    }

    let raw_id = cells[5].as_str();
    let youtube_id = if raw_id == MISSING_ID || raw_id == PLACEHOLDER_ID || raw_id.is_empty() {
        PLACEHOLDER_ID.to_string()
    } else if raw_id.contains("youtube.com") || raw_id.contains("youtu.be") {
        extract_youtube_id(raw_id).unwrap_or_else(|| PLACEHOLDER_ID.to_string())
    } else {
        raw_id.to_string()
    };

    let mut video = Video::new(position.to_string(), cells[1].clone(), youtube_id);
    video.creator = if cells[2] == UNKNOWN_CREATOR {
        String::new()
    } else {
        cells[2].clone()
    };
    video.duration = Some(match cells[3].as_str() {
        "N/A" | "" => DEFAULT_DURATION.to_string(),
        other => other.to_string(),
    });
    let xp = leading_int(&cells[4]).filter(|xp| *xp != 0).unwrap_or(DEFAULT_XP);
    video.xp_reward = Some(Number::from(xp));
    video.thumbnail = Some(if video.youtube_id == PLACEHOLDER_ID {
        PLACEHOLDER_THUMBNAIL.to_string()
    } else {
        thumbnail_url(&video.youtube_id)
    });

    if cells.get(6).map(String::as_str) == Some("🔄") {
        video.is_substitute = Some(true);
        video.substitute_reason = Some("Manually marked as substitute".to_string());
    }

    Ok(video)
}

fn parse_stat(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Some(Number::from(n));
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn is_heading(line: &str) -> bool {
    line.starts_with('#')
}

fn is_separator(line: &str) -> bool {
    line.len() > 2
        && line.starts_with('|')
        && line.ends_with('|')
        && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn is_table_header(line: &str) -> bool {
    let cells = split_row(line);
    line.starts_with('|') && cells.len() >= 2 && cells[0] == "#" && cells[1] == "Title"
}

/// Parse the Markdown layout produced by [`export_markdown`]
pub fn import_markdown(markdown: &str) -> MarkdownImport {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut modules: Vec<Module> = Vec::new();
    let mut warnings = Vec::new();
    let mut in_table = false;
    let mut table_open = false;

    for (n, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('>') {
            continue;
        }

        if let Some(title) = line.strip_prefix("# 📚") {
            let description = lines[n + 1..]
                .iter()
                .take(4)
                .find_map(|l| l.trim().strip_prefix("**Description:** "))
                .unwrap_or("")
                .to_string();
            modules.push(Module {
                id: format!("module-{}", modules.len() + 1),
                title: title.trim().to_string(),
                description,
                total_hours: Some(Number::from(DEFAULT_MODULE_HOURS)),
                total_xp: Some(Number::from(DEFAULT_MODULE_XP)),
                weeks: Vec::new(),
                extra: Map::new(),
            });
            in_table = false;
            continue;
        }

        if let Some(title) = line.strip_prefix("## 📅") {
            let Some(module) = modules.last_mut() else {
                warnings.push(format!("Line {}: week outside of a module", n + 1));
                continue;
            };
            let description = lines[n + 1..]
                .iter()
                .take(4)
                .find_map(|l| l.trim().strip_prefix("> "))
                .unwrap_or("")
                .to_string();
            module.weeks.push(Week {
                id: format!("week-{}", module.weeks.len() + 1),
                title: title.trim().to_string(),
                description,
                days: Vec::new(),
                extra: Map::new(),
            });
            in_table = false;
            continue;
        }

        if let Some(title) = line.strip_prefix("### 🎯") {
            let Some(week) = modules.last_mut().and_then(|m| m.weeks.last_mut()) else {
                warnings.push(format!("Line {}: day outside of a week", n + 1));
                continue;
            };

            let section: Vec<&str> = lines[n + 1..]
                .iter()
                .map(|l| l.trim())
                .take_while(|l| !is_heading(l))
                .collect();
            let practice_task = section
                .iter()
                .find_map(|l| l.strip_prefix("**Practice Task:** "))
                .map(str::to_string);
            let estimated_time = section
                .iter()
                .find_map(|l| l.strip_prefix("**Estimated Time:** "))
                .map(str::to_string);

            week.days.push(Day {
                id: format!("day-{}", week.days.len() + 1),
                title: title.trim().to_string(),
                videos: Vec::new(),
                practice_task,
                estimated_time,
                extra: Map::new(),
            });
            in_table = false;
            table_open = false;
            continue;
        }

        // Module stats sit between the module header and its first week
        if let Some(module) = modules.last_mut().filter(|m| m.weeks.is_empty()) {
            if let Some(value) = line.strip_prefix("- Total Hours:") {
                if let Some(n) = parse_stat(value) {
                    module.total_hours = Some(n);
                }
                continue;
            }
            if let Some(value) = line.strip_prefix("- Total XP:") {
                if let Some(n) = parse_stat(value) {
                    module.total_xp = Some(n);
                }
                continue;
            }
        }

        if is_table_header(line) {
            in_table = true;
            table_open = false;
            continue;
        }

        if in_table && is_separator(line) {
            table_open = true;
            continue;
        }

        if in_table && table_open && line.starts_with('|') && line.ends_with('|') {
            let m = modules.len() as u32;
            let target = modules.last_mut().and_then(|module| {
                let w = module.weeks.len() as u32;
                let week = module.weeks.last_mut()?;
                let d = week.days.len() as u32;
                week.days.last_mut().map(|day| (w, d, day))
            });
            let Some((w, d, day)) = target else {
                warnings.push(format!("Line {}: video row outside of a day", n + 1));
                continue;
            };

            let position = VideoPosition::new(m, w, d, day.videos.len() as u32 + 1);
            match parse_video_row(line, position) {
                Ok(video) => day.videos.push(video),
                Err(reason) => warnings.push(format!(
                    "Skipping invalid video row at line {}: {}",
                    n + 1,
                    reason
                )),
            }
            continue;
        }

        if in_table && (is_heading(line) || line == "---") {
            in_table = false;
            table_open = false;
        }
    }

    MarkdownImport {
        curriculum: Curriculum {
            modules,
            extra: Map::new(),
        },
        warnings,
    }
}
