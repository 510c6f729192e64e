//! Stats and coverage commands

use crate::config::Config;
use crate::curriculum::Curriculum;
use crate::error::{Error, Result};
use crate::store::{EmbeddingStats, SupabaseStore};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Embedding coverage of the chunk table
#[derive(Debug, Clone, Serialize)]
pub struct StatsInfo {
    pub supabase_url: String,
    pub embedding_model: String,
    pub transcripts: usize,
    pub chunks: EmbeddingStats,
    pub coverage_percent: f64,
}

/// Get embedding statistics
pub async fn cmd_stats(config: &Config, store: &SupabaseStore) -> Result<StatsInfo> {
    info!("Counting chunks and embeddings");

    let chunks = store.embedding_stats().await?;
    let transcripts = store.list_transcripts().await?.len();

    Ok(StatsInfo {
        supabase_url: config.supabase.url.clone(),
        embedding_model: config.embedding.model.clone(),
        transcripts,
        coverage_percent: chunks.coverage_percent(),
        chunks,
    })
}

/// Print stats information
pub fn print_stats(info: &StatsInfo) {
    println!("\n📊 Embedding Status\n");
    println!("Supabase:   {}", info.supabase_url);
    println!("Model:      {}", info.embedding_model);
    println!();
    println!("Transcripts:       {}", info.transcripts);
    println!("Total chunks:      {}", info.chunks.total_chunks);
    println!("With embeddings:   {}", info.chunks.embedded);
    println!("Missing:           {}", info.chunks.missing);
    println!("Coverage:          {:.1}%", info.coverage_percent);

    if info.chunks.missing > 0 {
        println!("\nRun `bloxbuddy embed` to backfill the missing embeddings.");
    }
}

/// One curriculum video without a stored transcript
#[derive(Debug, Clone, Serialize)]
pub struct MissingVideo {
    pub location: String,
    pub youtube_id: String,
    pub title: String,
}

/// Per-module transcript coverage
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleCoverage {
    pub videos: usize,
    pub with_transcript: usize,
}

/// Curriculum videos against stored transcripts
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoverageReport {
    pub videos: usize,
    pub placeholders: usize,
    pub with_transcript: usize,
    pub missing: Vec<MissingVideo>,
    pub modules: BTreeMap<String, ModuleCoverage>,
}

impl CoverageReport {
    /// Share of real (non-placeholder) videos with a transcript
    pub fn percent(&self) -> f64 {
        let real = self.videos - self.placeholders;
        if real == 0 {
            return 0.0;
        }
        self.with_transcript as f64 / real as f64 * 100.0
    }
}

/// Compare a curriculum with the set of stored YouTube ids
pub fn coverage_report(
    curriculum: &Curriculum,
    stored: &HashSet<String>,
    module_id: Option<&str>,
) -> Result<CoverageReport> {
    if let Some(id) = module_id {
        if curriculum.find_module(id).is_none() {
            return Err(Error::Curriculum(format!("Module not found: {}", id)));
        }
    }

    let mut report = CoverageReport::default();
    for entry in curriculum
        .videos()
        .filter(|v| module_id.map_or(true, |id| v.module.id == id))
    {
        report.videos += 1;
        if entry.video.is_placeholder() {
            report.placeholders += 1;
            continue;
        }

        let module = report.modules.entry(entry.module.id.clone()).or_default();
        module.videos += 1;

        if stored.contains(&entry.video.youtube_id) {
            module.with_transcript += 1;
            report.with_transcript += 1;
        } else {
            report.missing.push(MissingVideo {
                location: entry.location(),
                youtube_id: entry.video.youtube_id.clone(),
                title: entry.video.title.clone(),
            });
        }
    }

    Ok(report)
}

/// Execute coverage against the live transcript table
pub async fn cmd_coverage(
    curriculum: &Curriculum,
    store: &SupabaseStore,
    module_id: Option<&str>,
) -> Result<CoverageReport> {
    let stored: HashSet<String> = store
        .list_transcripts()
        .await?
        .into_iter()
        .map(|t| t.youtube_id)
        .collect();
    info!("{} transcripts stored", stored.len());

    coverage_report(curriculum, &stored, module_id)
}

/// Print coverage report
pub fn print_coverage(report: &CoverageReport) {
    println!("\n📊 Transcript Coverage\n");
    println!("Curriculum videos:   {}", report.videos);
    println!("Placeholders:        {}", report.placeholders);
    println!("With transcript:     {}", report.with_transcript);
    println!("Missing transcript:  {}", report.missing.len());
    println!("Coverage:            {:.1}%", report.percent());

    if !report.modules.is_empty() {
        println!("\nBy module:");
        for (id, module) in &report.modules {
            println!("  {:<12} {}/{}", id, module.with_transcript, module.videos);
        }
    }

    if !report.missing.is_empty() {
        println!("\nMissing:");
        for video in &report.missing {
            println!("  {} {} ({})", video.location, video.title, video.youtube_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::tests::sample;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_coverage_report() {
        let stored: HashSet<String> = ["dQw4w9WgXcQ".to_string()].into_iter().collect();
        let report = coverage_report(&sample(), &stored, None).unwrap();

        assert_eq!(report.videos, 3);
        assert_eq!(report.placeholders, 1);
        assert_eq!(report.with_transcript, 1);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].youtube_id, "abcdefghijk");
        assert_eq!(report.percent(), 50.0);
        assert_eq!(report.modules["module-1"].videos, 2);
    }

    #[test]
    fn test_coverage_unknown_module() {
        let result = coverage_report(&sample(), &HashSet::new(), Some("module-7"));
        assert!(matches!(result, Err(Error::Curriculum(_))));
    }

    #[tokio::test]
    async fn test_stats_from_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/transcript_chunks"))
            .and(query_param("embedding", "is.null"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-0/25").set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/transcript_chunks"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-0/100").set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/video_transcripts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "t-1", "youtube_id": "dQw4w9WgXcQ" },
                { "id": "t-2", "youtube_id": "abcdefghijk" }
            ])))
            .mount(&server)
            .await;

        let store = SupabaseStore::new(&server.uri(), "key").unwrap();
        let info = cmd_stats(&Config::default(), &store).await.unwrap();
        assert_eq!(info.transcripts, 2);
        assert_eq!(info.chunks.total_chunks, 100);
        assert_eq!(info.chunks.missing, 25);
        assert_eq!(info.coverage_percent, 75.0);
    }
}
