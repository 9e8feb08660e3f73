//! Serializable run report.
//!
//! [`DedupeReport`] is the single model every writer renders: the JSON
//! writer serializes it as-is, the CSV and text writers flatten it.
//!
//! # Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-05-01T10:00:00+00:00",
//!   "mode": "exact",
//!   "root": "/videos",
//!   "summary": { "total_files": 4, "total_groups": 2, "total_losers": 2, "reclaimable_bytes": 15000000, ... },
//!   "groups": [
//!     {
//!       "id": "hash:ab12...",
//!       "strategy": "exact",
//!       "keep": { "path": "/videos/a.mp4", "size": 10000000, ... },
//!       "losers": [ { "path": "/videos/b.mp4", ... } ],
//!       "reclaimable_bytes": 10000000
//!     }
//!   ],
//!   "diagnostics": { "failures": [], "notes": [] },
//!   "disposal": null
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::DisposalResult;
use crate::duplicates::{Diagnostics, Disposition, Mode, ScanOutcome, Strategy};
use crate::error::ExitCode;
use crate::scanner::FileRecord;

/// One file in the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportFile {
    /// Absolute path where possible
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified time (RFC 3339)
    pub modified: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate_bps: Option<u64>,
}

impl ReportFile {
    /// Build from a record.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Self {
        let media = record.media.as_ref();
        Self {
            path: normalize_path(&record.path),
            size: record.size,
            modified: format_time(record.modified),
            duration_seconds: media.and_then(|m| m.duration_seconds),
            width: media.and_then(|m| m.width),
            height: media.and_then(|m| m.height),
            video_bitrate_bps: media.and_then(|m| m.video_bitrate_bps),
        }
    }
}

/// One group with its keeper decision.
#[derive(Debug, Clone, Serialize)]
pub struct ReportGroup {
    /// Group id (`hash:<hex>`, `meta:<n>` or `phash:<n>`)
    pub id: String,
    /// Strategy that formed the group
    pub strategy: Strategy,
    /// Keeper
    pub keep: ReportFile,
    /// Non-keeper members
    pub losers: Vec<ReportFile>,
    /// Sum of loser sizes
    pub reclaimable_bytes: u64,
}

impl ReportGroup {
    /// Build from a disposition.
    #[must_use]
    pub fn from_disposition(disposition: &Disposition) -> Self {
        Self {
            id: disposition.group_id.to_string(),
            strategy: disposition.group_id.strategy(),
            keep: ReportFile::from_record(&disposition.keep),
            losers: disposition
                .losers
                .iter()
                .map(|r| ReportFile::from_record(r))
                .collect(),
            reclaimable_bytes: disposition.reclaimable_bytes(),
        }
    }
}

/// Run totals.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    /// Files that entered clustering
    pub total_files: usize,
    /// Their total size in bytes
    pub total_size: u64,
    /// Files with media metadata
    pub media_files: usize,
    /// Files with a perceptual signature
    pub signed_files: usize,
    /// Groups across all strategies
    pub total_groups: usize,
    /// Groups per strategy
    pub groups_by_strategy: Vec<StrategyCount>,
    /// Distinct files planned for disposal
    pub total_losers: usize,
    /// Bytes reclaimable by the plan
    pub reclaimable_bytes: u64,
    /// Losers kept because another group keeps them
    pub protected_losers: usize,
    /// Files with a recorded per-file failure
    pub failed_files: usize,
    /// Duration of the run in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "MD000")
    pub exit_code_name: String,
}

/// Group count for one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyCount {
    pub strategy: Strategy,
    pub groups: usize,
}

/// Complete report of one run.
#[derive(Debug, Clone, Serialize)]
pub struct DedupeReport {
    /// Report generation time (RFC 3339)
    pub generated_at: String,
    /// Mode of the run
    pub mode: Mode,
    /// Scan root
    pub root: PathBuf,
    /// Totals
    pub summary: ReportSummary,
    /// Groups in the order they were formed
    pub groups: Vec<ReportGroup>,
    /// Per-file failures and notes
    pub diagnostics: Diagnostics,
    /// Disposal result, when disposal ran
    pub disposal: Option<DisposalResult>,
}

impl DedupeReport {
    /// Build a report from a run outcome.
    #[must_use]
    pub fn new(outcome: &ScanOutcome, exit_code: ExitCode) -> Self {
        let summary = &outcome.summary;
        Self {
            generated_at: Utc::now().to_rfc3339(),
            mode: outcome.mode,
            root: outcome.root.clone(),
            summary: ReportSummary {
                total_files: summary.total_files,
                total_size: summary.total_size,
                media_files: summary.media_files,
                signed_files: summary.signed_files,
                total_groups: summary.total_groups,
                groups_by_strategy: summary
                    .groups_by_strategy
                    .iter()
                    .map(|&(strategy, groups)| StrategyCount { strategy, groups })
                    .collect(),
                total_losers: summary.total_losers,
                reclaimable_bytes: summary.reclaimable_bytes,
                protected_losers: outcome.plan.protected_count(),
                failed_files: outcome.diagnostics.failures.len(),
                scan_duration_ms: summary.duration.as_millis() as u64,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
            groups: outcome
                .dispositions
                .iter()
                .map(ReportGroup::from_disposition)
                .collect(),
            diagnostics: outcome.diagnostics.clone(),
            disposal: None,
        }
    }

    /// Attach a disposal result.
    #[must_use]
    pub fn with_disposal(mut self, disposal: DisposalResult) -> Self {
        self.disposal = Some(disposal);
        self
    }
}

/// Normalize a path to an absolute path string.
///
/// Falls back to the path as given if it cannot be canonicalized (e.g. the
/// file has been disposed of).
fn normalize_path(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

pub(crate) fn format_time(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.to_rfc3339()
}
