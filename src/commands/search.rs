//! Search command - resumable YouTube search for placeholder videos

use crate::checkpoint::{day_key, found_videos_file_name, FoundVideo, SearchCheckpoint};
use crate::config::Config;
use crate::curriculum::{write_atomic, Curriculum};
use crate::error::{Error, Result};
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::throttle::Pacer;
use crate::youtube::{build_search_query, pick_best_match, YouTubeClient};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Checkpoint is written after this many searches even mid-day
const SAVE_EVERY: usize = 10;

/// Search options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Forget the checkpoint and start from day 1
    pub reset: bool,
    /// Directory for the found-videos file (defaults next to the checkpoint)
    pub output_dir: Option<PathBuf>,
}

/// One placeholder video to look for
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTask {
    pub day_number: u32,
    pub day_title: String,
    pub title: String,
    pub creator: String,
}

/// How the run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Every remaining day was searched
    Completed,
    /// Nothing left to search
    NothingToDo,
    /// The daily quota ran out; progress is saved
    QuotaExceeded,
    /// The quota ran out recently and has not reset yet
    CoolingDown { hours_remaining: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub searched: usize,
    pub found: usize,
    pub errors: Vec<String>,
    pub total_searched: u64,
    pub total_found: u64,
    pub found_file: Option<PathBuf>,
}

impl SearchReport {
    fn new(outcome: SearchOutcome, checkpoint: &SearchCheckpoint) -> Self {
        Self {
            outcome,
            searched: 0,
            found: 0,
            errors: Vec::new(),
            total_searched: checkpoint.total_searched,
            total_found: checkpoint.total_found,
            found_file: None,
        }
    }
}

/// Placeholder videos on days the checkpoint has not finished, in day order
pub fn collect_search_tasks(curriculum: &Curriculum, checkpoint: &SearchCheckpoint) -> Vec<SearchTask> {
    curriculum
        .videos()
        .filter(|v| v.video.is_placeholder())
        .filter(|v| !checkpoint.is_day_done(v.day_number()))
        .map(|v| SearchTask {
            day_number: v.day_number(),
            day_title: v.day.title.clone(),
            title: v.video.title.clone(),
            creator: v.video.creator.clone(),
        })
        .collect()
}

/// Look one task up: best-scoring search hit plus its details
async fn search_one(
    client: &YouTubeClient,
    task: &SearchTask,
    max_results: u32,
) -> Result<Option<FoundVideo>> {
    let query = build_search_query(&task.title, &task.creator);
    info!("Searching: \"{}\"", query);

    let hits = client.search_videos(&query, max_results).await?;
    let Some(best) = pick_best_match(&query, Some(&task.creator), &hits) else {
        info!("No relevant video for \"{}\"", task.title);
        return Ok(None);
    };

    let details = client.video_details(&[best.hit.video_id.clone()]).await?;
    info!(
        score = best.score,
        confidence = %best.confidence,
        "Found: {} ({})",
        best.hit.title,
        best.hit.channel_title
    );
    Ok(Some(FoundVideo::new(
        &best,
        details.first(),
        &task.title,
        &task.creator,
    )))
}

/// Run the search, resuming from the checkpoint file
pub async fn cmd_search(
    config: &Config,
    client: &YouTubeClient,
    curriculum: &Curriculum,
    options: &SearchOptions,
) -> Result<SearchReport> {
    let checkpoint_path = config.data.checkpoint_file.as_path();
    let mut checkpoint = SearchCheckpoint::load_or_default(checkpoint_path)?;
    if options.reset {
        info!("Resetting search checkpoint");
        checkpoint.reset();
    }

    if let Some(remaining) =
        checkpoint.quota_cooldown_remaining(Utc::now(), config.youtube.quota_cooldown_hours)
    {
        let hours_remaining = remaining.num_minutes() as f64 / 60.0;
        warn!("Quota exhausted recently, {:.1} hours until reset", hours_remaining);
        return Ok(SearchReport::new(
            SearchOutcome::CoolingDown { hours_remaining },
            &checkpoint,
        ));
    }
    checkpoint.quota_exceeded_at = None;

    let tasks = collect_search_tasks(curriculum, &checkpoint);
    if tasks.is_empty() {
        info!("All placeholder videos have been searched");
        return Ok(SearchReport::new(SearchOutcome::NothingToDo, &checkpoint));
    }
    info!(
        "{} videos remaining, resuming after day {}",
        tasks.len(),
        checkpoint.last_searched_day
    );

    let mut report = SearchReport::new(SearchOutcome::Completed, &checkpoint);
    let pacer = Pacer::new(config.youtube.search_delay());
    let progress = start_progress_bar(tasks.len(), "Searching YouTube");

    for day_tasks in tasks.chunk_by(|a, b| a.day_number == b.day_number) {
        let day_number = day_tasks[0].day_number;
        info!("Day {}: {}", day_number, day_tasks[0].day_title);
        let mut day_found = Vec::new();
        let mut day_searched = 0u64;

        for task in day_tasks {
            pacer.wait().await;

            let found = match search_one(client, task, config.youtube.max_results).await {
                Ok(found) => found,
                Err(Error::QuotaExceeded) => {
                    warn!(
                        "YouTube API quota exceeded, day {} will be searched again",
                        day_number
                    );
                    checkpoint.mark_quota_exceeded(Utc::now());
                    checkpoint.save(checkpoint_path)?;
                    finish_progress(progress, "Quota exceeded");

                    report.outcome = SearchOutcome::QuotaExceeded;
                    report.total_searched = checkpoint.total_searched;
                    report.total_found = checkpoint.total_found;
                    return Ok(report);
                }
                Err(e) => {
                    warn!("Search for \"{}\" failed: {}", task.title, e);
                    report.errors.push(format!("{} ({}): {}", task.title, day_key(day_number), e));
                    None
                }
            };

            checkpoint.touch(Utc::now());
            day_searched += 1;
            report.searched += 1;
            if let Some(video) = found {
                report.found += 1;
                day_found.push(video);
            }

            if report.searched % SAVE_EVERY == 0 {
                checkpoint.save(checkpoint_path)?;
                info!("Checkpoint saved ({} searches completed)", report.searched);
            }
            advance_progress(&progress, 1);
        }

        checkpoint.record_day(day_number, day_searched, day_found, Utc::now());
        checkpoint.save(checkpoint_path)?;
    }
    finish_progress(progress, "Search complete");

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| parent_dir(checkpoint_path));
    let found_file = output_dir.join(found_videos_file_name(Utc::now().date_naive()));
    let mut out = serde_json::to_string_pretty(&checkpoint.found_videos)?;
    out.push('\n');
    write_atomic(&found_file, &out)?;
    info!("Found videos saved to {:?}", found_file);

    report.total_searched = checkpoint.total_searched;
    report.total_found = checkpoint.total_found;
    report.found_file = Some(found_file);
    Ok(report)
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Print search report
pub fn print_search_report(report: &SearchReport) {
    match &report.outcome {
        SearchOutcome::CoolingDown { hours_remaining } => {
            println!("\n⏰ YouTube API quota was exceeded recently.");
            println!("   Please wait {:.1} more hours for the quota to reset.", hours_remaining);
            println!("\n💡 The quota resets at midnight Pacific Time.");
            return;
        }
        SearchOutcome::NothingToDo => {
            println!("\n✅ All videos have been searched!");
            println!("📊 Total found: {} videos", report.total_found);
            return;
        }
        SearchOutcome::QuotaExceeded => {
            println!("\n⚠️  YouTube API quota exceeded!");
            println!("💾 Progress saved to checkpoint; the next run resumes automatically.");
        }
        SearchOutcome::Completed => println!("\n📊 Search complete"),
    }

    println!("  Videos found this session: {}", report.found);
    println!("  Searches this session: {}", report.searched);
    println!("  Total videos found: {}", report.total_found);
    println!("  Total searches: {}", report.total_searched);

    if !report.errors.is_empty() {
        println!("\nErrors:");
        for error in &report.errors {
            println!("  ⚠️ {}", error);
        }
    }
    if let Some(file) = &report.found_file {
        println!("\n💾 Found videos saved to: {}", file.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::tests::sample;
    use crate::curriculum::{Video, PLACEHOLDER_ID};
    use crate::youtube::Confidence;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn setup(tmp: &TempDir, server: &MockServer) -> (Config, YouTubeClient) {
        let mut config = Config::default();
        config.data.checkpoint_file = tmp.path().join("checkpoint.json");
        config.youtube.search_delay_ms = 0;
        let client =
            YouTubeClient::new(&format!("{}/youtube/v3", server.uri()), "key".to_string(), 50).unwrap();
        (config, client)
    }

    fn options(tmp: &TempDir) -> SearchOptions {
        SearchOptions {
            reset: false,
            output_dir: Some(tmp.path().to_path_buf()),
        }
    }

    #[test]
    fn test_collect_tasks_skips_done_days() {
        let curriculum = sample();
        let mut checkpoint = SearchCheckpoint::default();
        let tasks = collect_search_tasks(&curriculum, &checkpoint);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].day_number, 1);
        assert_eq!(tasks[0].title, "Moving Parts");

        checkpoint.record_day(1, 1, Vec::new(), Utc::now());
        assert!(collect_search_tasks(&curriculum, &checkpoint).is_empty());
    }

    #[tokio::test]
    async fn test_search_finds_and_checkpoints() {
        let tmp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("q", "Moving Parts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": { "videoId": "zzzzzzzzzzz" },
                      "snippet": { "title": "Cooking pasta", "channelTitle": "Chef" } },
                    { "id": { "videoId": "mvprt123456" },
                      "snippet": { "title": "Moving Parts in Roblox Studio tutorial", "channelTitle": "BloxDev" } }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "mvprt123456",
                    "contentDetails": { "duration": "PT9M30S" },
                    "statistics": { "viewCount": "4200" }
                }]
            })))
            .mount(&server)
            .await;

        let (config, client) = setup(&tmp, &server);
        let report = cmd_search(&config, &client, &sample(), &options(&tmp))
            .await
            .unwrap();

        assert_eq!(report.outcome, SearchOutcome::Completed);
        assert_eq!(report.searched, 1);
        assert_eq!(report.found, 1);

        let checkpoint = SearchCheckpoint::load_or_default(&config.data.checkpoint_file).unwrap();
        assert!(checkpoint.is_day_done(1));
        let found = &checkpoint.found_videos["day-1"][0];
        assert_eq!(found.video_id, "mvprt123456");
        assert_eq!(found.confidence, Confidence::Medium);
        assert_eq!(found.duration.as_deref(), Some("PT9M30S"));
        assert!(report.found_file.unwrap().exists());

        // A second run has nothing left
        let again = cmd_search(&config, &client, &sample(), &options(&tmp))
            .await
            .unwrap();
        assert_eq!(again.outcome, SearchOutcome::NothingToDo);
    }

    #[tokio::test]
    async fn test_quota_stops_and_cools_down() {
        let tmp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{ "reason": "quotaExceeded" }]
                }
            })))
            .mount(&server)
            .await;

        let (config, client) = setup(&tmp, &server);
        let report = cmd_search(&config, &client, &sample(), &options(&tmp))
            .await
            .unwrap();
        assert_eq!(report.outcome, SearchOutcome::QuotaExceeded);

        let checkpoint = SearchCheckpoint::load_or_default(&config.data.checkpoint_file).unwrap();
        assert!(checkpoint.quota_exceeded_at.is_some());
        assert!(!checkpoint.is_day_done(1));

        let again = cmd_search(&config, &client, &sample(), &options(&tmp))
            .await
            .unwrap();
        assert!(matches!(again.outcome, SearchOutcome::CoolingDown { .. }));
    }

    /// Day 1 with two placeholders: "Moving Parts" then "Scripting Events"
    fn two_placeholder_day() -> Curriculum {
        let mut curriculum = sample();
        let mut video = Video::new("video-1-1-1-3", "Scripting Events", PLACEHOLDER_ID);
        video.creator = "Coming Soon".to_string();
        curriculum
            .find_day_mut("module-1", "week-1", "day-1")
            .unwrap()
            .videos
            .push(video);
        curriculum
    }

    async fn mount_moving_parts(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("q", "Moving Parts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": { "videoId": "mvprt123456" },
                      "snippet": { "title": "Moving Parts in Roblox Studio tutorial", "channelTitle": "BloxDev" } }
                ]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": "mvprt123456", "contentDetails": { "duration": "PT9M30S" } }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_quota_mid_day_does_not_count_twice() {
        let tmp = TempDir::new().unwrap();
        let curriculum = two_placeholder_day();

        let first = MockServer::start().await;
        mount_moving_parts(&first).await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("q", "Scripting Events"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{ "reason": "quotaExceeded" }]
                }
            })))
            .mount(&first)
            .await;

        let (mut config, client) = setup(&tmp, &first);
        config.youtube.quota_cooldown_hours = 0;
        let report = cmd_search(&config, &client, &curriculum, &options(&tmp))
            .await
            .unwrap();
        assert_eq!(report.outcome, SearchOutcome::QuotaExceeded);
        assert_eq!(report.found, 1);

        let checkpoint = SearchCheckpoint::load_or_default(&config.data.checkpoint_file).unwrap();
        assert_eq!(checkpoint.total_searched, 0);
        assert_eq!(checkpoint.total_found, 0);
        assert!(checkpoint.found_videos.is_empty());

        // The quota is back; the second video has no match this time
        let second = MockServer::start().await;
        mount_moving_parts(&second).await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("q", "Scripting Events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&second)
            .await;

        let (_, client) = setup(&tmp, &second);
        let report = cmd_search(&config, &client, &curriculum, &options(&tmp))
            .await
            .unwrap();
        assert_eq!(report.outcome, SearchOutcome::Completed);

        let checkpoint = SearchCheckpoint::load_or_default(&config.data.checkpoint_file).unwrap();
        assert_eq!(checkpoint.total_searched, 2);
        assert_eq!(checkpoint.total_found, 1);
        assert_eq!(checkpoint.found_videos["day-1"].len(), 1);
        assert!(checkpoint.quota_exceeded_at.is_none());
    }

    #[tokio::test]
    async fn test_other_errors_are_collected() {
        let tmp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let (config, client) = setup(&tmp, &server);
        let report = cmd_search(&config, &client, &sample(), &options(&tmp))
            .await
            .unwrap();
        assert_eq!(report.outcome, SearchOutcome::Completed);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.found, 0);
    }
}
