//! mediadupe - duplicate and near-duplicate media finder
//!
//! Groups files by identical content (SHA-256), by tolerant media metadata
//! (duration, resolution, codec, container) or by perceptual frame
//! signatures, keeps one file per group by a configurable preference order
//! and deletes or quarantines the rest.
//!
//! The library entry point is [`duplicates::DedupeEngine`]; disposal lives
//! in [`actions`]. [`run_app`] wires both to the command line.

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::Disposer;
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::{EngineConfig, Settings};
use crate::duplicates::{Collaborators, DedupeEngine, ScanOutcome};
use crate::error::ExitCode;
use crate::output::{CsvOutput, DedupeReport, JsonOutput, TextOutput};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::ManifestProber;

/// Run the application for parsed CLI arguments.
///
/// # Errors
///
/// Returns configuration errors ([`config::ConfigError`]) before any file
/// I/O, and fatal scan errors ([`duplicates::FinderError`]) before any
/// disposal. Per-file errors never surface here; they are reported in the
/// output and turn the exit code into [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(ref args) => run_scan(args, cli.quiet, cli.accessible),
    }
}

fn run_scan(args: &ScanArgs, quiet: bool, accessible: bool) -> Result<ExitCode> {
    let settings = Settings::load(args.config.as_deref(), &args.overrides())?;
    let EngineConfig {
        finder,
        walker,
        media_manifest,
        dispose,
    } = settings.validate()?;
    log::debug!("Running with {:?}", finder);

    let shutdown = signal::install_handler();
    let show_progress = !quiet && args.output == OutputFormat::Text;
    let progress: Arc<dyn ProgressCallback> =
        Arc::new(Progress::with_accessible(!show_progress, accessible));

    let mut collaborators = Collaborators::default().with_enumerator(Arc::new(walker));
    if let Some(ref manifest) = media_manifest {
        let prober = Arc::new(
            ManifestProber::load(manifest)
                .with_context(|| format!("Failed to load media manifest {}", manifest.display()))?,
        );
        log::info!("Loaded media manifest with {} entr(ies)", prober.len());
        collaborators = collaborators
            .with_prober(prober.clone())
            .with_sampler(prober);
    }

    let finder = finder
        .with_shutdown_flag(shutdown.get_flag())
        .with_progress_callback(Arc::clone(&progress));
    let engine = DedupeEngine::with_collaborators(finder, collaborators);
    let outcome = engine.find(&args.path)?;

    let disposal = if (args.delete || dispose.dry_run) && !outcome.plan.is_empty() {
        let interactive = !dispose.force && !dispose.dry_run;
        let mut disposer = Disposer::new(dispose.with_scan_root(Some(outcome.root.clone())))
            .with_shutdown_flag(shutdown.get_flag());
        // Bars would interleave with confirmation prompts.
        if !interactive {
            disposer = disposer.with_progress_callback(Arc::clone(&progress));
        }
        Some(disposer.dispose(&outcome.plan))
    } else {
        None
    };

    let exit_code = determine_exit_code(
        &outcome,
        disposal.as_ref().is_some_and(|d| !d.all_succeeded()),
        shutdown.is_shutdown_requested(),
    );

    let mut report = DedupeReport::new(&outcome, exit_code);
    if let Some(disposal) = disposal {
        report = report.with_disposal(disposal);
    }

    if let Some(ref path) = args.report {
        JsonOutput::new(&report)
            .write_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&report).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&report).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&report).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}

/// Exit code for a completed run.
#[must_use]
pub fn determine_exit_code(outcome: &ScanOutcome, disposal_failed: bool, interrupted: bool) -> ExitCode {
    if interrupted {
        ExitCode::Interrupted
    } else if outcome.groups.is_empty() {
        ExitCode::NoDuplicates
    } else if disposal_failed || !outcome.diagnostics.failures.is_empty() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}
