//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Listening-history analyzer.
///
/// Ingests a play-history CSV, computes top artists/albums/tracks and
/// temporal listening patterns, and lets you backfill missing duration and
/// genre metadata that persists across sessions.
#[derive(Debug, Parser)]
#[command(name = "lh", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a listening-history CSV and print statistics.
    Report {
        /// The CSV file to analyze.
        file: PathBuf,

        /// Cap the artist/album/track/genre rankings at N entries.
        #[arg(long)]
        top: Option<usize>,

        /// Emit the full statistics snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Backfill metadata for one track; the correction persists and applies
    /// to every future report and export.
    Enrich {
        /// Artist name, matched exactly.
        #[arg(long)]
        artist: String,

        /// Album title, matched exactly.
        #[arg(long)]
        album: String,

        /// Track title, matched exactly.
        #[arg(long)]
        track: String,

        /// Track length in seconds.
        #[arg(long)]
        duration: Option<u64>,

        #[arg(long)]
        genre: Option<String>,

        /// Featured artist(s).
        #[arg(long)]
        feat: Option<String>,

        /// Producer credit.
        #[arg(long)]
        prod: Option<String>,

        /// Record label.
        #[arg(long)]
        label: Option<String>,
    },

    /// Re-serialize a CSV with persisted enrichments applied.
    Export {
        /// The CSV file to read.
        input: PathBuf,

        /// Where to write the enriched CSV.
        output: PathBuf,
    },

    /// List persisted overlay entries.
    Overlay {
        /// Emit entries as JSON.
        #[arg(long)]
        json: bool,
    },
}
