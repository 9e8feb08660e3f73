//! Command-line interface definitions for mediadupe.
//!
//! This module defines all CLI arguments and options using the clap derive API.
//! Every scan option is optional on the command line so that the config file
//! and environment layers can supply it (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Report exact duplicates
//! mediadupe scan ~/Videos
//!
//! # Near-duplicates by duration, JSON output
//! mediadupe scan ~/Videos --mode tolerance --tolerance 0.5 --media-manifest probe.json --output json
//!
//! # Quarantine losers without prompting
//! mediadupe scan ~/Videos --delete --yes --quarantine ~/dupes
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::duplicates::{Mode, PerceptualLinkage};

/// Duplicate and near-duplicate media finder.
///
/// mediadupe groups files by identical content (SHA-256), by tolerant media
/// metadata, or by perceptual frame signatures, keeps one file per group and
/// optionally deletes or quarantines the rest.
#[derive(Debug, Parser)]
#[command(name = "mediadupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as structured JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Use plain ASCII progress output
    #[arg(long, global = true)]
    pub accessible: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate media
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Grouping strategies to run
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Maximum duration difference in seconds for tolerance grouping
    #[arg(long, value_name = "SECONDS")]
    pub tolerance: Option<f64>,

    /// Tolerance grouping requires identical resolution
    #[arg(long)]
    pub same_resolution: bool,

    /// Tolerance grouping requires identical video codec
    #[arg(long)]
    pub same_codec: bool,

    /// Tolerance grouping requires identical container
    #[arg(long)]
    pub same_container: bool,

    /// Frames sampled per file for perceptual grouping
    #[arg(long, value_name = "N")]
    pub frames: Option<usize>,

    /// Perceptual Hamming distance budget per frame
    #[arg(long, value_name = "BITS")]
    pub phash_threshold: Option<u32>,

    /// How perceptual matches are linked into groups
    #[arg(long, value_enum)]
    pub linkage: Option<PerceptualLinkage>,

    /// Keeper preference order, comma separated
    ///
    /// Criteria: longer, resolution, video_bitrate, newer, smaller, deeper
    #[arg(short, long, value_name = "CRITERIA", value_delimiter = ',')]
    pub keep: Option<Vec<String>>,

    /// Maximum directory depth (1 = files directly in PATH)
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Only consider files matching this glob (relative to PATH)
    #[arg(short, long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Follow symbolic links during scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// JSON manifest with media metadata and frame signatures
    #[arg(long, value_name = "FILE")]
    pub media_manifest: Option<PathBuf>,

    /// Worker threads for hashing and sampling (0 = all CPUs)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Also write the full JSON report to FILE
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Dispose of losers (without this flag the run only reports)
    #[arg(long)]
    pub delete: bool,

    /// Report disposals without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Skip per-file confirmation
    #[arg(short = 'y', long = "yes", alias = "force")]
    pub yes: bool,

    /// Move losers into this directory instead of deleting them
    #[arg(long, value_name = "DIR")]
    pub quarantine: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ScanArgs {
    /// Settings given on the command line.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        let flag = |set: bool| set.then_some(true);
        Overrides {
            mode: self.mode,
            duration_tolerance_seconds: self.tolerance,
            require_same_resolution: flag(self.same_resolution),
            require_same_codec: flag(self.same_codec),
            require_same_container: flag(self.same_container),
            perceptual_frame_count: self.frames,
            perceptual_threshold_per_frame: self.phash_threshold,
            perceptual_linkage: self.linkage,
            keep_priority: self.keep.clone(),
            threads: self.threads,
            max_depth: self.max_depth,
            pattern: self.pattern.clone(),
            follow_symlinks: flag(self.follow_symlinks),
            media_manifest: self.media_manifest.clone(),
            dry_run: flag(self.dry_run),
            force: flag(self.yes),
            quarantine_root: self.quarantine.clone(),
        }
    }
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON report for scripting
    Json,
    /// CSV rows for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
