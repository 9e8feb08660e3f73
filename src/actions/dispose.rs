//! Loser disposal: delete or quarantine.
//!
//! # Overview
//!
//! [`Disposer`] walks a [`DisposalPlan`] strictly in order, one file at a
//! time:
//! - dry-run reports what would happen and touches nothing
//! - without `force`, each file needs a confirmation ([`Confirm`]);
//!   declining skips that file and the run continues
//! - with a quarantine root, the file is moved under it preserving its
//!   path relative to the scan root
//! - otherwise the file is deleted
//!
//! # Safety
//!
//! Before touching a file its size is compared with the scan snapshot, so
//! a file replaced since the scan is left alone. A quarantine destination
//! is never overwritten. Every per-file failure is recorded and the
//! remaining files are still processed.
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::actions::{DisposeConfig, Disposer};
//! # use mediadupe::actions::DisposalPlan;
//! # let plan = DisposalPlan::default();
//!
//! let disposer = Disposer::new(DisposeConfig::default().with_dry_run(true));
//! let result = disposer.dispose(&plan);
//! println!("{}", result.summary());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::Disposition;
use crate::progress::ProgressCallback;
use crate::scanner::{FileIdentity, FileRecord};

/// Error type for a single disposal.
#[derive(Debug, Error)]
pub enum DisposeError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete or move.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File size changed since the scan.
    #[error("file modified since scan: {path} (size {expected} -> {actual})")]
    Modified {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Quarantine destination already exists.
    #[error("quarantine destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DisposeError {
    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }

    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::DestinationExists(p)
            | Self::Modified { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// Distinct losers across all dispositions, minus every keeper.
///
/// In `all` mode a file can be the keeper of one group and a loser of
/// another; it stays on disk. A loser that resolves to the same file as a
/// keeper (a hard link, or a symlink to or from it) is also kept, since
/// removing it frees nothing or leaves the keeper dangling.
#[derive(Debug, Clone, Default)]
pub struct DisposalPlan {
    items: Vec<Arc<FileRecord>>,
    protected: usize,
}

impl DisposalPlan {
    /// Build the plan from per-group dispositions, preserving first
    /// occurrence order.
    ///
    /// Keepers and losers are stat'ed to compare file identities; a path
    /// that cannot be stat'ed is compared by path only.
    #[must_use]
    pub fn from_dispositions(dispositions: &[Disposition]) -> Self {
        let keepers: HashSet<&Path> = dispositions.iter().map(|d| d.keep.path.as_path()).collect();
        let keeper_files: HashSet<FileIdentity> = keepers
            .iter()
            .filter_map(|path| FileIdentity::of_path(path))
            .collect();
        let mut seen: HashSet<&Path> = HashSet::new();
        let mut items = Vec::new();
        let mut protected = 0;

        for loser in dispositions.iter().flat_map(|d| &d.losers) {
            let path = loser.path.as_path();
            if !seen.insert(path) {
                continue;
            }
            if keepers.contains(path) {
                log::debug!("Not disposing {}: kept by another group", path.display());
                protected += 1;
                continue;
            }
            if FileIdentity::of_path(path).is_some_and(|id| keeper_files.contains(&id)) {
                log::warn!("Not disposing {}: same file as a keeper", path.display());
                protected += 1;
                continue;
            }
            items.push(Arc::clone(loser));
        }

        Self { items, protected }
    }

    /// Files to dispose, in order.
    #[must_use]
    pub fn items(&self) -> &[Arc<FileRecord>] {
        &self.items
    }

    /// Number of files to dispose.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is nothing to dispose.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Losers dropped from the plan because they are, or resolve to, a
    /// keeper.
    #[must_use]
    pub fn protected_count(&self) -> usize {
        self.protected
    }

    /// Total bytes of the planned files.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|r| r.size).sum()
    }
}

/// Configuration for disposal.
#[derive(Debug, Clone, Default)]
pub struct DisposeConfig {
    /// Report actions without touching the filesystem.
    pub dry_run: bool,
    /// Skip per-file confirmation.
    pub force: bool,
    /// Move losers here instead of deleting them.
    pub quarantine_root: Option<PathBuf>,
    /// Root the relative quarantine layout is computed from.
    pub scan_root: Option<PathBuf>,
}

impl DisposeConfig {
    /// Enable/disable dry-run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable/disable force (no confirmation).
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Quarantine into `root` instead of deleting.
    #[must_use]
    pub fn with_quarantine_root(mut self, root: Option<PathBuf>) -> Self {
        self.quarantine_root = root;
        self
    }

    /// Set the scan root.
    #[must_use]
    pub fn with_scan_root(mut self, root: Option<PathBuf>) -> Self {
        self.scan_root = root;
        self
    }
}

/// What happens to a loser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Remove the file.
    Delete,
    /// Move the file to `destination`.
    Quarantine { destination: PathBuf },
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Quarantine { destination } => write!(f, "move to {}", destination.display()),
        }
    }
}

/// How a disposal ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Dry-run: the action would have been performed.
    WouldPerform,
    /// The action was performed.
    Performed,
    /// The user declined the confirmation.
    Declined,
    /// The action failed; the file is untouched.
    Failed(String),
    /// Not attempted because of shutdown.
    Skipped,
}

/// Record of one loser's disposal.
#[derive(Debug, Clone, Serialize)]
pub struct DisposalAction {
    /// Loser path.
    pub path: PathBuf,
    /// Loser size from the scan.
    pub size: u64,
    /// Requested action.
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Result.
    pub outcome: ActionOutcome,
}

/// Results of a disposal run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DisposalResult {
    /// Whether the run was a dry-run.
    pub dry_run: bool,
    /// One entry per planned file, in order.
    pub actions: Vec<DisposalAction>,
    /// Files removed or moved (or that would be, under dry-run).
    pub disposed_count: usize,
    /// Bytes reclaimed (or that would be, under dry-run).
    pub bytes_reclaimed: u64,
}

impl DisposalResult {
    fn count_outcome(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(&a.outcome)).count()
    }

    /// Number of failed disposals.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.count_outcome(|o| matches!(o, ActionOutcome::Failed(_)))
    }

    /// Number of declined disposals.
    #[must_use]
    pub fn declined_count(&self) -> usize {
        self.count_outcome(|o| matches!(o, ActionOutcome::Declined))
    }

    /// Number of files skipped because of shutdown.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count_outcome(|o| matches!(o, ActionOutcome::Skipped))
    }

    /// Check if no disposal failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }

    /// Human-readable summary of the run.
    #[must_use]
    pub fn summary(&self) -> String {
        let size = bytesize::ByteSize::b(self.bytes_reclaimed);
        let verb = if self.dry_run { "Would dispose" } else { "Disposed" };
        let mut summary = format!("{} {} file(s), {}", verb, self.disposed_count, size);
        for (count, label) in [
            (self.declined_count(), "declined"),
            (self.failure_count(), "failed"),
            (self.skipped_count(), "skipped"),
        ] {
            if count > 0 {
                summary.push_str(&format!(", {} {}", count, label));
            }
        }
        summary
    }
}

/// Per-file confirmation.
pub trait Confirm: Send + Sync {
    /// Return `true` to proceed with `kind` on `path`.
    fn confirm(&self, path: &Path, kind: &ActionKind) -> bool;
}

/// Prompts on stderr and reads `y`/`yes` from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, path: &Path, kind: &ActionKind) -> bool {
        eprint!("{} {}? [y/N] ", kind, path.display());
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Confirms everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _path: &Path, _kind: &ActionKind) -> bool {
        true
    }
}

/// Declines everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _path: &Path, _kind: &ActionKind) -> bool {
        false
    }
}

/// Executes a disposal plan.
pub struct Disposer {
    config: DisposeConfig,
    confirm: Box<dyn Confirm>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .finish_non_exhaustive()
    }
}

impl Disposer {
    /// Create a disposer that prompts on stdin when not forced.
    #[must_use]
    pub fn new(config: DisposeConfig) -> Self {
        Self {
            config,
            confirm: Box::new(StdinConfirm),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Replace the confirmation source.
    #[must_use]
    pub fn with_confirm(mut self, confirm: Box<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Action the disposer takes for `path`.
    #[must_use]
    pub fn action_for(&self, path: &Path) -> ActionKind {
        match self.config.quarantine_root {
            Some(ref root) => ActionKind::Quarantine {
                destination: quarantine_destination(root, self.config.scan_root.as_deref(), path),
            },
            None => ActionKind::Delete,
        }
    }

    /// Dispose every planned file, sequentially.
    pub fn dispose(&self, plan: &DisposalPlan) -> DisposalResult {
        let mut result = DisposalResult {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        let callback = self.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_phase_start("dispose", plan.len());
        }

        for (idx, record) in plan.items().iter().enumerate() {
            let kind = self.action_for(&record.path);

            let outcome = if self.is_shutdown_requested() {
                log::info!("Skipped (shutdown): {}", record.path.display());
                ActionOutcome::Skipped
            } else {
                if let Some(cb) = callback {
                    cb.on_progress(idx + 1, &record.path.to_string_lossy());
                }
                self.dispose_one(record, &kind)
            };

            if matches!(outcome, ActionOutcome::Performed | ActionOutcome::WouldPerform) {
                result.disposed_count += 1;
                result.bytes_reclaimed += record.size;
                if let Some(cb) = callback {
                    cb.on_item_completed(record.size);
                }
            }
            result.actions.push(DisposalAction {
                path: record.path.clone(),
                size: record.size,
                kind,
                outcome,
            });
        }

        if let Some(cb) = callback {
            cb.on_phase_end("dispose");
        }
        log::info!("{}", result.summary());
        result
    }

    fn dispose_one(&self, record: &FileRecord, kind: &ActionKind) -> ActionOutcome {
        let path = &record.path;

        if self.config.dry_run {
            log::info!("[dry-run] Would {}: {}", kind, path.display());
            return ActionOutcome::WouldPerform;
        }

        if !self.config.force && !self.confirm.confirm(path, kind) {
            log::info!("Declined: {}", path.display());
            return ActionOutcome::Declined;
        }

        let performed = verify_snapshot(record).and_then(|()| match kind {
            ActionKind::Delete => fs::remove_file(path).map_err(|e| DisposeError::from_io(path, e)),
            ActionKind::Quarantine { destination } => move_file(path, destination),
        });

        match performed {
            Ok(()) => {
                log::info!("Disposed ({}): {} ({} bytes)", kind, path.display(), record.size);
                ActionOutcome::Performed
            }
            Err(e) => {
                log::warn!("Failed to {} {}: {}", kind, path.display(), e);
                ActionOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Check the file still has the size seen during the scan.
fn verify_snapshot(record: &FileRecord) -> Result<(), DisposeError> {
    let metadata = fs::metadata(&record.path).map_err(|e| DisposeError::from_io(&record.path, e))?;
    if metadata.len() != record.size {
        return Err(DisposeError::Modified {
            path: record.path.clone(),
            expected: record.size,
            actual: metadata.len(),
        });
    }
    Ok(())
}

/// Destination of `path` under `quarantine_root`.
///
/// The path relative to `scan_root` is preserved. Paths outside the scan
/// root keep their full path minus the root and prefix components. Only
/// normal components are kept, so the result never leaves the quarantine
/// tree.
#[must_use]
pub fn quarantine_destination(quarantine_root: &Path, scan_root: Option<&Path>, path: &Path) -> PathBuf {
    let relative = scan_root
        .and_then(|root| path.strip_prefix(root).ok())
        .unwrap_or(path);

    let mut destination = quarantine_root.to_path_buf();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            destination.push(part);
        }
    }
    destination
}

fn move_file(source: &Path, destination: &Path) -> Result<(), DisposeError> {
    move_file_with(source, destination, |from, to| fs::rename(from, to))
}

/// Move with a caller-supplied rename step; on failure falls back to
/// copy + remove, and removes a partial copy if that fails too.
fn move_file_with(
    source: &Path,
    destination: &Path,
    rename: impl FnOnce(&Path, &Path) -> io::Result<()>,
) -> Result<(), DisposeError> {
    if destination.exists() {
        return Err(DisposeError::DestinationExists(destination.to_path_buf()));
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| DisposeError::from_io(parent, e))?;
    }

    let rename_err = match rename(source, destination) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    log::debug!(
        "rename {} -> {} failed ({}), trying copy",
        source.display(),
        destination.display(),
        rename_err
    );

    let copied = fs::copy(source, destination).and_then(|_| fs::remove_file(source));
    if copied.is_err() {
        // Leave the source as the only copy.
        if source.exists() {
            let _ = fs::remove_file(destination);
        }
        return Err(DisposeError::from_io(source, rename_err));
    }
    Ok(())
}
