//! Per-run diagnostics.
//!
//! Recoverable per-file failures and "feature unavailable" notes are
//! collected here and handed back with the run's output, so every run's
//! diagnostics can be inspected on their own.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Pipeline stage at which a per-file failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    /// Reading filesystem metadata
    Stat,
    /// Media metadata probing
    Probe,
    /// Content hashing
    Hash,
    /// Perceptual frame sampling
    Sample,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stat => write!(f, "stat"),
            Self::Probe => write!(f, "probe"),
            Self::Hash => write!(f, "hash"),
            Self::Sample => write!(f, "sample"),
        }
    }
}

/// One recoverable per-file failure.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    /// Stage that failed
    pub stage: FailureStage,
    /// File concerned
    pub path: PathBuf,
    /// Error message
    pub message: String,
}

/// Diagnostics collected during one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// Per-file failures, in the order they were recorded
    pub failures: Vec<FileFailure>,
    /// Informational notes (e.g. a collaborator produced no data)
    pub notes: Vec<String>,
}

impl Diagnostics {
    /// Record a per-file failure.
    pub fn record_failure(&mut self, stage: FailureStage, path: &Path, error: &dyn fmt::Display) {
        self.failures.push(FileFailure {
            stage,
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    /// Record a note once; repeated notes are dropped.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.notes.contains(&message) {
            log::info!("{}", message);
            self.notes.push(message);
        }
    }

    /// Number of failures at a given stage.
    #[must_use]
    pub fn failure_count(&self, stage: FailureStage) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }

    /// Whether no per-file failure was recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Append another run segment's diagnostics.
    pub fn merge(&mut self, other: Diagnostics) {
        self.failures.extend(other.failures);
        for note in other.notes {
            self.note(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut diagnostics = Diagnostics::default();
        assert!(diagnostics.is_clean());

        diagnostics.record_failure(FailureStage::Hash, Path::new("/a"), &"boom");
        diagnostics.record_failure(FailureStage::Probe, Path::new("/b"), &"bad");

        assert!(!diagnostics.is_clean());
        assert_eq!(diagnostics.failure_count(FailureStage::Hash), 1);
        assert_eq!(diagnostics.failure_count(FailureStage::Sample), 0);
        assert_eq!(diagnostics.failures[0].message, "boom");
    }

    #[test]
    fn test_notes_deduplicated() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.note("no signatures");
        diagnostics.note("no signatures");
        assert_eq!(diagnostics.notes.len(), 1);
    }

    #[test]
    fn test_runs_are_independent() {
        let mut first = Diagnostics::default();
        let second = Diagnostics::default();
        first.note("only in first");
        assert!(second.notes.is_empty());
    }
}
