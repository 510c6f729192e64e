//! Playlist commands - import a YouTube playlist into the curriculum

use crate::config::Config;
use crate::curriculum::{
    assign_playlist, build_playlist_videos, create_backup, AssignSummary, Curriculum,
    PlaylistFile, PlaylistPlan,
};
use crate::error::{Error, Result};
use crate::youtube::YouTubeClient;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fetch a playlist with durations and write it as JSON
pub async fn cmd_playlist_fetch(
    client: &YouTubeClient,
    playlist_id: &str,
    output: &Path,
) -> Result<PlaylistFile> {
    info!("Fetching playlist {}", playlist_id);
    let items = client.playlist_items(playlist_id).await?;
    if items.is_empty() {
        return Err(Error::YouTube(format!("Playlist {} has no videos", playlist_id)));
    }

    let ids: Vec<String> = items.iter().map(|i| i.video_id.clone()).collect();
    let details = client.video_details(&ids).await?;
    info!("{} items, {} with details", items.len(), details.len());

    let file = PlaylistFile {
        playlist_id: playlist_id.to_string(),
        fetched_at: Some(Utc::now().to_rfc3339()),
        videos: build_playlist_videos(&items, &details),
    };
    file.save(output)?;
    Ok(file)
}

/// Print a fetched playlist
pub fn print_playlist(file: &PlaylistFile, output: &Path) {
    println!("\n📺 Playlist {} ({} videos)\n", file.playlist_id, file.videos.len());
    for video in &file.videos {
        println!(
            "  {:>3}. {} [{}] {} XP",
            video.position + 1,
            video.title,
            video.duration,
            video.xp_reward
        );
    }
    let minutes: u64 = file.videos.iter().map(|v| v.total_minutes).sum();
    println!("\nTotal: {}h {}m", minutes / 60, minutes % 60);
    println!("💾 Saved to {}", output.display());
}

/// Where to place a fetched playlist
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub file: PathBuf,
    pub module_id: String,
    pub week_id: String,
    pub first_day: usize,
    pub per_day: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub backup: PathBuf,
    pub summary: AssignSummary,
}

/// Back up the curriculum, assign the playlist and save
pub fn cmd_playlist_apply(config: &Config, options: &ApplyOptions) -> Result<ApplyReport> {
    let playlist = PlaylistFile::load(&options.file)?;
    let curriculum_path = config.data.curriculum_file.as_path();
    let mut curriculum = Curriculum::load(curriculum_path)?;

    let plan = PlaylistPlan {
        playlist_id: playlist.playlist_id.clone(),
        module_id: options.module_id.clone(),
        week_id: options.week_id.clone(),
        first_day: options.first_day,
        per_day: options.per_day,
    };

    // Validate the placement before writing anything
    let summary = assign_playlist(&mut curriculum, &plan, &playlist.videos)?;

    let backup = create_backup(
        curriculum_path,
        &config.backup_dir(),
        &format!("Before applying playlist {}", playlist.playlist_id),
    )?;
    curriculum.save(curriculum_path)?;

    Ok(ApplyReport { backup, summary })
}

/// Print apply report
pub fn print_apply_report(report: &ApplyReport) {
    println!("\n✓ Playlist applied");
    for (day, count) in &report.summary.days {
        println!("  {}: {} videos", day, count);
    }
    if report.summary.created_days > 0 {
        println!("  New days created: {}", report.summary.created_days);
    }
    println!("  Backup: {}", report.backup.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::tests::SAMPLE;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_writes_playlist_file() {
        let tmp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/playlistItems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "snippet": { "title": "Part 1", "channelTitle": "BloxDev", "position": 0,
                                   "resourceId": { "videoId": "plist000001" } } },
                    { "snippet": { "title": "Part 2", "channelTitle": "BloxDev", "position": 1,
                                   "resourceId": { "videoId": "plist000002" } } }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": "plist000001", "snippet": { "title": "Part 1", "channelTitle": "BloxDev" },
                      "contentDetails": { "duration": "PT1H" } },
                    { "id": "plist000002", "snippet": { "title": "Part 2", "channelTitle": "BloxDev" },
                      "contentDetails": { "duration": "PT10M" } }
                ]
            })))
            .mount(&server)
            .await;

        let client =
            YouTubeClient::new(&format!("{}/youtube/v3", server.uri()), "key".to_string(), 50).unwrap();
        let output = tmp.path().join("playlist.json");
        let file = cmd_playlist_fetch(&client, "PL123", &output).await.unwrap();

        assert_eq!(file.videos.len(), 2);
        assert_eq!(file.videos[0].xp_reward, 30);
        assert_eq!(file.videos[1].xp_reward, 20);
        let loaded = PlaylistFile::load(&output).unwrap();
        assert_eq!(loaded.playlist_id, "PL123");
    }

    #[test]
    fn test_apply_backs_up_and_is_repeatable() {
        let tmp = TempDir::new().unwrap();
        let curriculum_file = tmp.path().join("curriculum.json");
        std::fs::write(&curriculum_file, SAMPLE).unwrap();

        let playlist = PlaylistFile {
            playlist_id: "PL123".to_string(),
            fetched_at: None,
            videos: serde_json::from_value(json!([
                { "youtubeId": "plist000001", "title": "Part 1", "creator": "BloxDev",
                  "duration": "10:00", "totalMinutes": 10, "rawDuration": "PT10M",
                  "position": 0, "xpReward": 20 },
                { "youtubeId": "plist000002", "title": "Part 2", "creator": "BloxDev",
                  "duration": "20:00", "totalMinutes": 20, "rawDuration": "PT20M",
                  "position": 1, "xpReward": 20 }
            ]))
            .unwrap(),
        };
        let playlist_file = tmp.path().join("playlist.json");
        playlist.save(&playlist_file).unwrap();

        let mut config = Config::default();
        config.data.curriculum_file = curriculum_file.clone();
        config.data.backup_dir = Some(tmp.path().join("backups"));
        let options = ApplyOptions {
            file: playlist_file,
            module_id: "module-1".to_string(),
            week_id: "week-1".to_string(),
            first_day: 2,
            per_day: 1,
        };

        let report = cmd_playlist_apply(&config, &options).unwrap();
        assert!(report.backup.exists());
        assert_eq!(report.summary.created_days, 1);
        let first = std::fs::read_to_string(&curriculum_file).unwrap();

        cmd_playlist_apply(&config, &options).unwrap();
        let second = std::fs::read_to_string(&curriculum_file).unwrap();
        assert_eq!(first, second);

        let curriculum = Curriculum::load(&curriculum_file).unwrap();
        let day3 = curriculum.find_day("module-1", "week-1", "day-3").unwrap();
        assert_eq!(day3.videos[0].youtube_id, "plist000002");
        assert_eq!(day3.videos[0].id, "video-1-1-3-1");
    }

    #[test]
    fn test_apply_unknown_week_leaves_file_alone() {
        let tmp = TempDir::new().unwrap();
        let curriculum_file = tmp.path().join("curriculum.json");
        std::fs::write(&curriculum_file, SAMPLE).unwrap();
        let playlist_file = tmp.path().join("playlist.json");
        PlaylistFile {
            playlist_id: "PL1".to_string(),
            fetched_at: None,
            videos: Vec::new(),
        }
        .save(&playlist_file)
        .unwrap();

        let mut config = Config::default();
        config.data.curriculum_file = curriculum_file.clone();
        let options = ApplyOptions {
            file: playlist_file,
            module_id: "module-1".to_string(),
            week_id: "week-9".to_string(),
            first_day: 1,
            per_day: 2,
        };

        assert!(cmd_playlist_apply(&config, &options).is_err());
        assert_eq!(std::fs::read_to_string(&curriculum_file).unwrap(), SAMPLE);
        assert_eq!(list_dir_len(tmp.path()), 2);
    }

    fn list_dir_len(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }
}
