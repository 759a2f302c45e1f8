use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lh_cli::commands::{enrich, export, overlay, report};
use lh_cli::{Cli, Commands, Config};

/// Load config and open the overlay database, ensuring the parent directory
/// exists.
fn open_database(config_path: Option<&Path>) -> Result<(lh_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = lh_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Report { file, top, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            report::run(db, file, *top, *json)?;
        }
        Some(Commands::Enrich {
            artist,
            album,
            track,
            duration,
            genre,
            feat,
            prod,
            label,
        }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let patch = lh_core::MetadataPatch {
                duration_secs: *duration,
                genre: genre.clone(),
                feat: feat.clone(),
                prod: prod.clone(),
                label: label.clone(),
            };
            enrich::run(db, artist, album, track, patch)?;
        }
        Some(Commands::Export { input, output }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            export::run(db, input, output)?;
        }
        Some(Commands::Overlay { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            overlay::run(db, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
