//! Curriculum maintenance commands
//!
//! Every command that rewrites the curriculum file backs it up first.

use crate::config::Config;
use crate::curriculum::{
    create_backup, export_markdown, import_markdown, list_backups, restore_backup, BackupInfo,
    Curriculum, CurriculumStats, FixIdsSummary, Validation, Video,
};
use crate::error::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default report name, written into the backup directory
pub const REPORT_FILE: &str = "curriculum-validation-report.md";

#[derive(Debug, Clone, Serialize)]
pub struct ValidateReport {
    pub validation: Validation,
    pub report_file: Option<PathBuf>,
}

/// Validate the curriculum and optionally write the Markdown report.
/// Pair with [`ensure_valid`] to turn errors into a failed command.
pub fn cmd_validate(config: &Config, report_path: Option<&Path>, write_report: bool) -> Result<ValidateReport> {
    let path = config.data.curriculum_file.as_path();
    let validation = Validation::validate_file(path)?;

    let report_file = if write_report {
        let target = report_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.backup_dir().join(REPORT_FILE));
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, validation.report(&file_name, Utc::now()))?;
        info!("Validation report written to {:?}", target);
        Some(target)
    } else {
        None
    };

    Ok(ValidateReport {
        validation,
        report_file,
    })
}

/// Print validation results
pub fn print_validation(report: &ValidateReport) {
    let v = &report.validation;
    let s = &v.stats;

    println!("\n📋 Curriculum Validation\n");
    println!("Modules: {}  Weeks: {}  Days: {}  Videos: {}", s.modules, s.weeks, s.days, s.videos);
    println!(
        "Valid videos: {}  Placeholders: {}  Substitutes: {}",
        s.valid_videos(),
        s.placeholders,
        s.substitutes
    );

    if !v.errors.is_empty() {
        println!("\n❌ Errors ({}):", v.errors.len());
        for issue in &v.errors {
            match &issue.location {
                Some(location) => println!("  {} ({})", issue.message, location),
                None => println!("  {}", issue.message),
            }
        }
    }
    if !v.warnings.is_empty() {
        println!("\n⚠️  Warnings ({}):", v.warnings.len());
        for issue in &v.warnings {
            match &issue.location {
                Some(location) => println!("  {} ({})", issue.message, location),
                None => println!("  {}", issue.message),
            }
        }
    }

    if v.passed() {
        println!("\n✅ Validation passed");
    } else if !v.has_errors() {
        println!("\n✅ Validation passed with warnings");
    }
    if let Some(file) = &report.report_file {
        println!("\n📄 Report: {}", file.display());
    }
}

/// Fail the command when validation found errors
pub fn ensure_valid(report: &ValidateReport) -> Result<()> {
    if report.validation.has_errors() {
        return Err(Error::ValidationFailed(report.validation.errors.len()));
    }
    Ok(())
}

/// Write a backup of the current curriculum
pub fn cmd_backup(config: &Config, reason: &str) -> Result<PathBuf> {
    create_backup(&config.data.curriculum_file, &config.backup_dir(), reason)
}

pub fn print_backup(path: &Path) {
    println!("\n💾 Backup created: {}", path.display());
}

/// Backups of the curriculum, newest first
pub fn cmd_backups(config: &Config) -> Result<Vec<BackupInfo>> {
    list_backups(&config.backup_dir())
}

pub fn print_backups(backups: &[BackupInfo]) {
    if backups.is_empty() {
        println!("No backups found.");
        return;
    }

    println!("\n💾 Curriculum Backups\n");
    for backup in backups {
        let created = backup
            .created
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let videos = backup
            .stats
            .as_ref()
            .map(|s| format!("{} videos", s.videos))
            .unwrap_or_default();
        println!(
            "  {}  {}  {:>8} bytes  {}",
            created, backup.file_name, backup.size_bytes, videos
        );
        if let Some(reason) = &backup.reason {
            println!("      {}", reason);
        }
    }
}

/// Resolve a backup argument: a path, or a file name inside the backup dir
fn resolve_backup(config: &Config, backup: &str) -> Result<PathBuf> {
    let direct = PathBuf::from(backup);
    if direct.exists() {
        return Ok(direct);
    }
    let in_dir = config.backup_dir().join(backup);
    if in_dir.exists() {
        return Ok(in_dir);
    }
    Err(Error::Curriculum(format!("Backup not found: {}", backup)))
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub restored_from: PathBuf,
    pub safety_backup: Option<PathBuf>,
}

/// Restore a backup over the curriculum file
pub fn cmd_restore(config: &Config, backup: &str) -> Result<RestoreReport> {
    let restored_from = resolve_backup(config, backup)?;
    let safety_backup = restore_backup(
        &restored_from,
        &config.data.curriculum_file,
        &config.backup_dir(),
    )?;
    Ok(RestoreReport {
        restored_from,
        safety_backup,
    })
}

pub fn print_restore(report: &RestoreReport) {
    println!("\n✓ Restored from {}", report.restored_from.display());
    if let Some(safety) = &report.safety_backup {
        println!("  Previous version saved to {}", safety.display());
    }
}

/// Export the curriculum to Markdown
pub fn cmd_export(config: &Config, output: &Path) -> Result<CurriculumStats> {
    let curriculum = Curriculum::load(&config.data.curriculum_file)?;
    std::fs::write(output, export_markdown(&curriculum, Utc::now()))?;
    info!("Exported curriculum to {:?}", output);
    Ok(curriculum.stats())
}

pub fn print_export(stats: &CurriculumStats, output: &Path) {
    println!("\n📝 Exported to {}", output.display());
    println!(
        "  {} modules, {} weeks, {} days, {} videos ({} placeholders)",
        stats.modules, stats.weeks, stats.days, stats.videos, stats.placeholders
    );
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub stats: CurriculumStats,
    pub warnings: Vec<String>,
    pub backup: Option<PathBuf>,
}

/// Replace the curriculum with one parsed from Markdown
pub fn cmd_import(config: &Config, input: &Path) -> Result<ImportReport> {
    let markdown = std::fs::read_to_string(input)?;
    let import = import_markdown(&markdown);
    for warning in &import.warnings {
        warn!("{}", warning);
    }
    if import.curriculum.modules.is_empty() {
        return Err(Error::Curriculum(format!(
            "No modules found in {}",
            input.display()
        )));
    }

    let path = config.data.curriculum_file.as_path();
    let backup = if path.exists() {
        Some(create_backup(path, &config.backup_dir(), "Before Markdown import")?)
    } else {
        None
    };
    import.curriculum.save(path)?;

    Ok(ImportReport {
        stats: import.curriculum.stats(),
        warnings: import.warnings,
        backup,
    })
}

pub fn print_import(report: &ImportReport) {
    let s = &report.stats;
    println!("\n✓ Imported curriculum");
    println!("  {} modules, {} weeks, {} days, {} videos", s.modules, s.weeks, s.days, s.videos);
    if let Some(backup) = &report.backup {
        println!("  Backup: {}", backup.display());
    }
    if !report.warnings.is_empty() {
        println!("\n⚠️  Skipped rows ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }
}

/// Where a day's new video list goes
#[derive(Debug, Clone)]
pub struct SetDayOptions {
    pub module_id: String,
    pub week_id: String,
    pub day_id: String,
    /// JSON array of videos
    pub videos_file: PathBuf,
}

/// Replace one day's videos, backing the file up first
pub fn cmd_set_day(config: &Config, options: &SetDayOptions) -> Result<PathBuf> {
    let content = std::fs::read_to_string(&options.videos_file)?;
    let videos: Vec<Video> = serde_json::from_str(&content)?;

    let path = config.data.curriculum_file.as_path();
    let mut curriculum = Curriculum::load(path)?;
    curriculum.set_day_videos(&options.module_id, &options.week_id, &options.day_id, videos)?;

    let backup = create_backup(
        path,
        &config.backup_dir(),
        &format!(
            "Before replacing videos of {}/{}/{}",
            options.module_id, options.week_id, options.day_id
        ),
    )?;
    curriculum.save(path)?;
    Ok(backup)
}

#[derive(Debug, Clone, Serialize)]
pub struct FixIdsReport {
    /// `None` when nothing needed fixing and the file was left alone
    pub backup: Option<PathBuf>,
    pub summary: FixIdsSummary,
}

/// Repair malformed and duplicate video ids, backing the file up first
pub fn cmd_fix_ids(config: &Config) -> Result<FixIdsReport> {
    let path = config.data.curriculum_file.as_path();
    let mut curriculum = Curriculum::load(path)?;
    let summary = curriculum.fix_ids();
    if summary.is_empty() {
        info!("All video ids are already consistent");
        return Ok(FixIdsReport {
            backup: None,
            summary,
        });
    }

    let backup = create_backup(path, &config.backup_dir(), "Before fixing video ids")?;
    curriculum.save(path)?;
    info!(
        "Rewrote {} video ids and {} placeholder ids",
        summary.video_ids.len(),
        summary.placeholders
    );
    Ok(FixIdsReport {
        backup: Some(backup),
        summary,
    })
}

/// Print fix-ids report
pub fn print_fix_ids(report: &FixIdsReport) {
    let summary = &report.summary;
    if summary.is_empty() {
        println!("\n✓ All video ids are consistent, nothing to fix");
        return;
    }

    println!("\n🔧 Fixed curriculum ids");
    for change in &summary.video_ids {
        println!("  {}: {} → {}", change.location, change.old_id, change.new_id);
    }
    if summary.placeholders > 0 {
        println!("  Placeholder YouTube ids normalised: {}", summary.placeholders);
    }
    if let Some(backup) = &report.backup {
        println!("  Backup: {}", backup.display());
    }
}
