//! Init command implementation

use crate::config::{Config, PathsConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub config_path: PathBuf,
    pub force: bool,
}

/// Write a default configuration file
pub fn cmd_init(options: &InitOptions) -> Result<Config> {
    let config_path = &options.config_path;
    if config_path.exists() && !options.force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.paths = PathsConfig {
        base_dir: config_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(Config::default_base_dir),
        config_file: config_path.clone(),
    };
    config.save()?;

    info!("Initialized configuration at {:?}", config_path);
    Ok(config)
}

/// Print the result of init
pub fn print_init(config: &Config) {
    println!("\n✓ Wrote {}", config.paths.config_file.display());
    println!("\nSecrets are read from the environment:");
    println!("  {}  (Supabase service role key)", config.supabase.key_env);
    println!("  {}  (embeddings)", config.embedding.api_key_env);
    println!("  {}  (YouTube Data API)", config.youtube.api_key_env);
    println!("\nNext steps:");
    println!("  bloxbuddy curriculum validate");
    println!("  bloxbuddy ingest --embed");
}
