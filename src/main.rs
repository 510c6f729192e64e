//! bloxbuddy CLI entry point

use bloxbuddy::{
    chunk::ChunkStrategy,
    commands::{
        cmd_backup, cmd_backups, cmd_chunk, cmd_coverage, cmd_embed, cmd_export, cmd_fix_ids,
        cmd_import, cmd_ingest, cmd_init, cmd_playlist_apply, cmd_playlist_fetch, cmd_rechunk,
        cmd_restore, cmd_search, cmd_set_day, cmd_stats, cmd_validate, collect_targets,
        ensure_valid, explicit_targets, print_apply_report, print_backfill_stats, print_backup,
        print_backups, print_chunks, print_coverage, print_export, print_fix_ids, print_import,
        print_ingest_stats, print_init, print_playlist, print_rechunk_stats, print_restore,
        print_search_report, print_stats, print_validation, ApplyOptions, ChunkOptions,
        IngestOptions, InitOptions, RechunkOptions, SearchOptions, SetDayOptions,
    },
    config::Config,
    curriculum::Curriculum,
    embed::create_embedder,
    error::Result,
    progress::LogWriterFactory,
    store::SupabaseStore,
    transcript::{FileTranscriptFetcher, TimeUnit, TranscriptFetcher, YtTranscriptFetcher},
    youtube::YouTubeClient,
};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bloxbuddy")]
#[command(version, about = "Content pipeline for the Blox Buddy curriculum", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Curriculum JSON file (overrides the config)
    #[arg(long, global = true)]
    curriculum: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Fetch, chunk and store transcripts for curriculum videos
    Ingest {
        /// Only videos of this module
        #[arg(long)]
        module: Option<String>,

        /// Explicit YouTube video ids (repeatable)
        #[arg(long = "video")]
        videos: Vec<String>,

        /// Embed chunks while ingesting
        #[arg(long)]
        embed: bool,

        /// Skip videos that already have a stored transcript
        #[arg(long)]
        skip_existing: bool,

        /// Videos processed concurrently
        #[arg(long)]
        batch_size: Option<usize>,

        /// Read transcripts from exported files instead of YouTube: a
        /// directory of <youtube_id>.json files or one file keyed by id
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Unit of offsets and durations in --from-file transcripts (s or ms)
        #[arg(long, default_value = "s")]
        unit: TimeUnit,
    },

    /// Rebuild chunk rows from stored transcripts with the current settings
    Rechunk {
        /// Only these YouTube video ids (repeatable)
        #[arg(long = "video")]
        videos: Vec<String>,

        /// Unit of offsets in the stored transcripts (s or ms)
        #[arg(long, default_value = "s")]
        unit: TimeUnit,
    },

    /// Backfill embeddings for stored chunks that have none
    Embed {
        /// Maximum number of chunks to embed
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show embedding coverage of the chunk table
    Stats,

    /// Compare curriculum videos with stored transcripts
    Coverage {
        /// Only videos of this module
        #[arg(long)]
        module: Option<String>,
    },

    /// Chunk an exported transcript file offline
    Chunk {
        /// Transcript JSON file
        file: PathBuf,

        /// Unit of offsets and durations in the file (s or ms)
        #[arg(long, default_value = "s")]
        unit: TimeUnit,

        /// Window length in seconds
        #[arg(long)]
        window: Option<f64>,

        /// Chunking strategy (window or overlap)
        #[arg(long)]
        strategy: Option<ChunkStrategy>,
    },

    /// Search YouTube for placeholder videos, resuming from the checkpoint
    Search {
        /// Discard the checkpoint and start over
        #[arg(long)]
        reset: bool,

        /// Directory for the found-videos file
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Import a YouTube playlist
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Maintain the curriculum file
    Curriculum {
        #[command(subcommand)]
        action: CurriculumAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PlaylistAction {
    /// Fetch playlist items with durations into a JSON file
    Fetch {
        /// Playlist id
        playlist_id: String,

        /// Output file
        #[arg(short, long, default_value = "playlist.json")]
        output: PathBuf,
    },

    /// Distribute a fetched playlist over the days of a week
    Apply {
        /// Playlist JSON written by `playlist fetch`
        file: PathBuf,

        /// Module id
        #[arg(long)]
        module: String,

        /// Week id
        #[arg(long)]
        week: String,

        /// Day number the first video lands on
        #[arg(long, default_value = "1")]
        first_day: usize,

        /// Videos per day
        #[arg(long, default_value = "3")]
        per_day: usize,
    },
}

#[derive(Subcommand)]
enum CurriculumAction {
    /// Check the curriculum and write a Markdown report
    Validate {
        /// Report file (defaults into the backup directory)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Do not write a report file
        #[arg(long)]
        no_report: bool,
    },

    /// Create a timestamped backup
    Backup {
        /// Reason stored in the backup metadata
        #[arg(long, default_value = "Manual backup")]
        reason: String,
    },

    /// List backups, newest first
    Backups,

    /// Restore a backup (the current file is backed up first)
    Restore {
        /// Backup file path or name inside the backup directory
        backup: String,
    },

    /// Export to editable Markdown
    Export {
        /// Output file
        #[arg(short, long, default_value = "curriculum.md")]
        output: PathBuf,
    },

    /// Replace the curriculum with an edited Markdown export
    Import {
        /// Markdown file
        file: PathBuf,
    },

    /// Rebuild malformed or duplicate video ids from their position
    FixIds,

    /// Replace the videos of one day
    SetDay {
        /// Module id
        #[arg(long)]
        module: String,

        /// Week id
        #[arg(long)]
        week: String,

        /// Day id
        #[arg(long)]
        day: String,

        /// JSON array of videos
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let options = InitOptions {
                config_path: cli.config.clone().unwrap_or_else(Config::default_config_path),
                force,
            };
            let config = cmd_init(&options)?;
            if !cli.json {
                print_init(&config);
            }
            return Ok(());
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "bloxbuddy", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(curriculum) = &cli.curriculum {
        config.data.curriculum_file = curriculum.clone();
    }
    let json = cli.json;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => {}

        Commands::Ingest {
            module,
            videos,
            embed,
            skip_existing,
            batch_size,
            from_file,
            unit,
        } => {
            let options = IngestOptions {
                module_id: module,
                video_ids: videos,
                embed,
                skip_existing,
                batch_size,
            };

            let targets = if options.video_ids.is_empty() {
                let curriculum = Curriculum::load(&config.data.curriculum_file)?;
                collect_targets(&curriculum, options.module_id.as_deref())?
            } else {
                let curriculum = Curriculum::load(&config.data.curriculum_file).ok();
                explicit_targets(curriculum.as_ref(), &options.video_ids)?
            };

            let store = SupabaseStore::connect(&config.supabase)?;
            let fetcher: Box<dyn TranscriptFetcher> = match &from_file {
                Some(path) => Box::new(FileTranscriptFetcher::open(path, unit)?),
                None => Box::new(YtTranscriptFetcher::new(&config.ingest.language)?),
            };
            let embedder = if options.embed {
                Some(create_embedder(&config.embedding)?)
            } else {
                None
            };

            let stats = cmd_ingest(
                &config,
                &store,
                &*fetcher,
                embedder.as_deref(),
                targets,
                &options,
            )
            .await?;
            output(json, &stats, print_ingest_stats)?;
        }

        Commands::Rechunk { videos, unit } => {
            let store = SupabaseStore::connect(&config.supabase)?;
            let options = RechunkOptions {
                video_ids: videos,
                unit,
            };
            let stats = cmd_rechunk(&config, &store, &options).await?;
            output(json, &stats, print_rechunk_stats)?;
        }

        Commands::Embed { limit } => {
            let store = SupabaseStore::connect(&config.supabase)?;
            let embedder = create_embedder(&config.embedding)?;
            let stats = cmd_embed(&config, &store, &*embedder, limit).await?;
            output(json, &stats, print_backfill_stats)?;
        }

        Commands::Stats => {
            let store = SupabaseStore::connect(&config.supabase)?;
            let info = cmd_stats(&config, &store).await?;
            output(json, &info, print_stats)?;
        }

        Commands::Coverage { module } => {
            let curriculum = Curriculum::load(&config.data.curriculum_file)?;
            let store = SupabaseStore::connect(&config.supabase)?;
            let report = cmd_coverage(&curriculum, &store, module.as_deref()).await?;
            output(json, &report, print_coverage)?;
        }

        Commands::Chunk {
            file,
            unit,
            window,
            strategy,
        } => {
            let options = ChunkOptions {
                unit,
                window_secs: window,
                strategy,
            };
            let preview = cmd_chunk(&config, &file, &options)?;
            output(json, &preview, print_chunks)?;
        }

        Commands::Search { reset, output_dir } => {
            let curriculum = Curriculum::load(&config.data.curriculum_file)?;
            let client = YouTubeClient::from_config(&config.youtube)?;
            let options = SearchOptions { reset, output_dir };
            let report = cmd_search(&config, &client, &curriculum, &options).await?;
            output(json, &report, print_search_report)?;
        }

        Commands::Playlist { action } => handle_playlist(&config, action, json).await?,

        Commands::Curriculum { action } => handle_curriculum(&config, action, json)?,
    }

    Ok(())
}

/// Print as pretty JSON or with the human-readable printer
fn output<T: Serialize>(json: bool, value: &T, print: impl Fn(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

/// An explicit config path must exist; the default one falls back to defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}

async fn handle_playlist(config: &Config, action: PlaylistAction, json: bool) -> Result<()> {
    match action {
        PlaylistAction::Fetch {
            playlist_id,
            output: file,
        } => {
            let client = YouTubeClient::from_config(&config.youtube)?;
            let playlist = cmd_playlist_fetch(&client, &playlist_id, &file).await?;
            output(json, &playlist, |p| print_playlist(p, &file))?;
        }

        PlaylistAction::Apply {
            file,
            module,
            week,
            first_day,
            per_day,
        } => {
            let options = ApplyOptions {
                file,
                module_id: module,
                week_id: week,
                first_day,
                per_day,
            };
            let report = cmd_playlist_apply(config, &options)?;
            output(json, &report, print_apply_report)?;
        }
    }

    Ok(())
}

fn handle_curriculum(config: &Config, action: CurriculumAction, json: bool) -> Result<()> {
    match action {
        CurriculumAction::Validate { report, no_report } => {
            let result = cmd_validate(config, report.as_deref(), !no_report)?;
            output(json, &result, print_validation)?;
            ensure_valid(&result)?;
        }

        CurriculumAction::Backup { reason } => {
            let path = cmd_backup(config, &reason)?;
            output(json, &path, |p| print_backup(p))?;
        }

        CurriculumAction::Backups => {
            let backups = cmd_backups(config)?;
            output(json, &backups, |b| print_backups(b))?;
        }

        CurriculumAction::Restore { backup } => {
            let report = cmd_restore(config, &backup)?;
            output(json, &report, print_restore)?;
        }

        CurriculumAction::Export { output: file } => {
            let stats = cmd_export(config, &file)?;
            output(json, &stats, |s| print_export(s, &file))?;
        }

        CurriculumAction::Import { file } => {
            let report = cmd_import(config, &file)?;
            output(json, &report, print_import)?;
        }

        CurriculumAction::FixIds => {
            let report = cmd_fix_ids(config)?;
            output(json, &report, print_fix_ids)?;
        }

        CurriculumAction::SetDay {
            module,
            week,
            day,
            file,
        } => {
            let options = SetDayOptions {
                module_id: module,
                week_id: week,
                day_id: day,
                videos_file: file,
            };
            let backup = cmd_set_day(config, &options)?;
            output(json, &backup, |p| print_backup(p))?;
        }
    }

    Ok(())
}
