//! Timestamped curriculum backups

use super::{write_atomic, CurriculumStats};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

const BACKUP_PREFIX: &str = "curriculum-backup-";
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Metadata stored next to the backed-up curriculum
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub original_file: String,
    pub backup_date: String,
    pub backup_reason: String,
    pub stats: CurriculumStats,
    pub file_size: u64,
    #[serde(default)]
    pub tool_version: Option<String>,
}

/// On-disk backup layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFile {
    pub metadata: BackupMetadata,
    pub curriculum: Value,
}

/// A backup found on disk
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub created: Option<NaiveDateTime>,
    pub size_bytes: u64,
    pub stats: Option<CurriculumStats>,
    pub reason: Option<String>,
}

/// `curriculum-backup-YYYY-MM-DDTHH-MM-SS.json`
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("{}{}.json", BACKUP_PREFIX, at.format(BACKUP_TIME_FORMAT))
}

fn parse_backup_time(file_name: &str) -> Option<NaiveDateTime> {
    let stamp = file_name.strip_prefix(BACKUP_PREFIX)?.strip_suffix(".json")?;
    let stamp = stamp.get(..19)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()
}

/// Back up a curriculum file into `backup_dir`, returning the new path
pub fn create_backup(curriculum_path: &Path, backup_dir: &Path, reason: &str) -> Result<PathBuf> {
    create_backup_at(curriculum_path, backup_dir, reason, Utc::now())
}

/// As [`create_backup`] with an explicit timestamp. A second backup within
/// the same second gets a numeric suffix.
pub fn create_backup_at(
    curriculum_path: &Path,
    backup_dir: &Path,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<PathBuf> {
    if !curriculum_path.exists() {
        return Err(Error::Curriculum(format!(
            "Curriculum file not found: {}",
            curriculum_path.display()
        )));
    }

    let content = std::fs::read_to_string(curriculum_path)?;
    let curriculum: Value = serde_json::from_str(&content)?;
    let stats = CurriculumStats::from_value(&curriculum);

    std::fs::create_dir_all(backup_dir)?;
    let mut path = backup_dir.join(backup_file_name(at));
    let mut n = 1;
    while path.exists() {
        let stem = backup_file_name(at);
        let stem = stem.trim_end_matches(".json");
        path = backup_dir.join(format!("{}-{}.json", stem, n));
        n += 1;
    }

    let backup = BackupFile {
        metadata: BackupMetadata {
            original_file: curriculum_path.display().to_string(),
            backup_date: at.to_rfc3339(),
            backup_reason: reason.to_string(),
            stats,
            file_size: content.len() as u64,
            tool_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        },
        curriculum,
    };

    let mut out = serde_json::to_string_pretty(&backup)?;
    out.push('\n');
    write_atomic(&path, &out)?;

    info!("Created backup {}", path.display());
    Ok(path)
}

/// Backups in a directory, newest first
pub fn list_backups(backup_dir: &Path) -> Result<Vec<BackupInfo>> {
    if !backup_dir.exists() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in std::fs::read_dir(backup_dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.starts_with(BACKUP_PREFIX) || !file_name.ends_with(".json") {
            continue;
        }

        let path = entry.path();
        let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let metadata = std::fs::read_to_string(&path)
            .ok()
            .and_then(|c| serde_json::from_str::<BackupFile>(&c).ok())
            .map(|b| b.metadata);

        backups.push(BackupInfo {
            created: parse_backup_time(&file_name),
            stats: metadata.as_ref().map(|m| m.stats.clone()),
            reason: metadata.map(|m| m.backup_reason),
            path,
            file_name,
            size_bytes,
        });
    }

    backups.sort_by(|a, b| b.file_name.cmp(&a.file_name));
    Ok(backups)
}

/// Restore a backup over the curriculum file.
///
/// The current file is backed up first (returned path). Both wrapped
/// backups and plain curriculum copies are accepted.
pub fn restore_backup(
    backup_path: &Path,
    curriculum_path: &Path,
    backup_dir: &Path,
) -> Result<Option<PathBuf>> {
    let content = std::fs::read_to_string(backup_path)?;
    let value: Value = serde_json::from_str(&content)?;

    let curriculum = match value {
        Value::Object(mut map) if map.contains_key("metadata") && map.contains_key("curriculum") => {
            map.remove("curriculum").unwrap_or(Value::Null)
        }
        other => other,
    };

    if curriculum.get("modules").and_then(Value::as_array).is_none() {
        return Err(Error::Curriculum(format!(
            "{} does not contain a curriculum",
            backup_path.display()
        )));
    }

    let safety = if curriculum_path.exists() {
        Some(create_backup(curriculum_path, backup_dir, "Pre-restore backup")?)
    } else {
        None
    };

    let mut out = serde_json::to_string_pretty(&curriculum)?;
    out.push('\n');
    write_atomic(curriculum_path, &out)?;

    info!(
        "Restored {} from {}",
        curriculum_path.display(),
        backup_path.display()
    );
    Ok(safety)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::tests::SAMPLE;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 27, h, m, s).unwrap()
    }

    #[test]
    fn test_backup_file_name() {
        assert_eq!(
            backup_file_name(at(9, 5, 7)),
            "curriculum-backup-2025-08-27T09-05-07.json"
        );
        assert_eq!(
            parse_backup_time("curriculum-backup-2025-08-27T09-05-07.json"),
            Some(at(9, 5, 7).naive_utc())
        );
        assert_eq!(parse_backup_time("curriculum.json"), None);
    }

    #[test]
    fn test_create_and_list_backups() {
        let tmp = TempDir::new().unwrap();
        let curriculum = tmp.path().join("curriculum.json");
        std::fs::write(&curriculum, SAMPLE).unwrap();
        let dir = tmp.path().join("backups");

        let first = create_backup_at(&curriculum, &dir, "manual", at(9, 0, 0)).unwrap();
        let second = create_backup_at(&curriculum, &dir, "manual", at(10, 0, 0)).unwrap();
        let clash = create_backup_at(&curriculum, &dir, "manual", at(10, 0, 0)).unwrap();
        assert_ne!(second, clash);

        let backups = list_backups(&dir).unwrap();
        assert_eq!(backups.len(), 3);
        assert!(backups[0].file_name.starts_with("curriculum-backup-2025-08-27T10-00-00"));
        assert_eq!(backups.last().unwrap().path, first);

        let stats = backups[0].stats.as_ref().unwrap();
        assert_eq!(stats.videos, 3);
        assert_eq!(stats.placeholders, 1);
        assert_eq!(backups[0].reason.as_deref(), Some("manual"));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(list_backups(&tmp.path().join("none")).unwrap().is_empty());
    }

    #[test]
    fn test_restore_wrapped_backup() {
        let tmp = TempDir::new().unwrap();
        let curriculum = tmp.path().join("curriculum.json");
        std::fs::write(&curriculum, SAMPLE).unwrap();
        let dir = tmp.path().join("backups");

        let backup = create_backup_at(&curriculum, &dir, "manual", at(9, 0, 0)).unwrap();
        std::fs::write(&curriculum, r#"{"modules": []}"#).unwrap();

        let safety = restore_backup(&backup, &curriculum, &dir).unwrap();
        assert!(safety.is_some());
        assert_eq!(std::fs::read_to_string(&curriculum).unwrap(), SAMPLE);
    }

    #[test]
    fn test_restore_plain_copy_and_reject_garbage() {
        let tmp = TempDir::new().unwrap();
        let curriculum = tmp.path().join("curriculum.json");
        let plain = tmp.path().join("copy.json");
        std::fs::write(&plain, SAMPLE).unwrap();

        let safety = restore_backup(&plain, &curriculum, tmp.path()).unwrap();
        assert!(safety.is_none());
        assert!(curriculum.exists());

        let garbage = tmp.path().join("garbage.json");
        std::fs::write(&garbage, r#"{"hello": 1}"#).unwrap();
        assert!(restore_backup(&garbage, &curriculum, tmp.path()).is_err());
    }
}
