//! Clustering engine orchestration.
//!
//! # Overview
//!
//! [`DedupeEngine`] runs the pipeline:
//! 1. **Collect** - enumerate the root, stat and (if needed) probe every file
//! 2. **Prepare** - fill content hashes and perceptual signatures on a
//!    bounded worker pool, then join
//! 3. **Cluster** - run the enabled strategies single-threaded
//!    (exact, then tolerance, then perceptual)
//! 4. **Select** - pick one keeper per group and build the disposal plan
//!
//! Nothing here touches the filesystem destructively; disposal is a
//! separate step (see [`crate::actions`]).
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::duplicates::{DedupeEngine, FinderConfig, Mode};
//! use std::path::Path;
//!
//! let engine = DedupeEngine::new(FinderConfig::default().with_mode(Mode::Exact));
//! let outcome = engine.find(Path::new("/videos")).unwrap();
//!
//! for disposition in &outcome.dispositions {
//!     println!("{}: keep {}", disposition.group_id, disposition.keep.path.display());
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::diagnostics::{Diagnostics, FailureStage};
use super::exact::{bucket_by_hash, ExactHashGrouper};
use super::groups::{Disposition, Group, Strategy};
use super::perceptual::{PerceptualClusterer, PerceptualConfig};
use super::selector::{KeepCriterion, WinnerSelector};
use super::tolerance::{ToleranceClusterer, ToleranceConfig};
use crate::actions::DisposalPlan;
use crate::progress::ProgressCallback;
use crate::scanner::{
    Enumerator, ExactHasher, FileRecord, MetadataProber, NullProber, PerceptualSampler,
    ScanError, Sha256Hasher, WalkEnumerator,
};

/// Which grouping strategies a run uses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Identical content hash only
    #[default]
    Exact,
    /// Metadata tolerance only
    Tolerance,
    /// Perceptual signatures only
    Perceptual,
    /// All three strategies as independent passes
    All,
}

impl Mode {
    /// Whether the exact-hash strategy runs.
    #[must_use]
    pub fn uses_exact(self) -> bool {
        matches!(self, Self::Exact | Self::All)
    }

    /// Whether the tolerance strategy runs.
    #[must_use]
    pub fn uses_tolerance(self) -> bool {
        matches!(self, Self::Tolerance | Self::All)
    }

    /// Whether the perceptual strategy runs.
    #[must_use]
    pub fn uses_perceptual(self) -> bool {
        matches!(self, Self::Perceptual | Self::All)
    }

    /// Whether records need media metadata.
    #[must_use]
    pub fn needs_media(self) -> bool {
        self.uses_tolerance() || self.uses_perceptual()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Tolerance => write!(f, "tolerance"),
            Self::Perceptual => write!(f, "perceptual"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Configuration for the engine.
#[derive(Clone)]
pub struct FinderConfig {
    /// Strategies to run
    pub mode: Mode,
    /// Tolerance predicate parameters
    pub tolerance: ToleranceConfig,
    /// Perceptual clustering parameters
    pub perceptual: PerceptualConfig,
    /// Keeper preference order
    pub keep_priority: Vec<KeepCriterion>,
    /// Worker threads for hashing and sampling (0 = available CPUs)
    pub threads: usize,
    /// Optional shutdown flag for graceful termination
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinderConfig")
            .field("mode", &self.mode)
            .field("tolerance", &self.tolerance)
            .field("perceptual", &self.perceptual)
            .field("keep_priority", &self.keep_priority)
            .field("threads", &self.threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            tolerance: ToleranceConfig::default(),
            perceptual: PerceptualConfig::default(),
            keep_priority: WinnerSelector::default().priority().to_vec(),
            threads: 0,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the grouping mode.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the tolerance parameters.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: ToleranceConfig) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the perceptual parameters.
    #[must_use]
    pub fn with_perceptual(mut self, perceptual: PerceptualConfig) -> Self {
        self.perceptual = perceptual;
        self
    }

    /// Set the keeper preference order.
    #[must_use]
    pub fn with_keep_priority(mut self, priority: Vec<KeepCriterion>) -> Self {
        self.keep_priority = priority;
        self
    }

    /// Set the worker thread count (0 = available CPUs).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the shutdown flag for graceful termination.
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

    /// Effective worker count.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        }
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// External collaborators that produce per-file facts.
#[derive(Clone)]
pub struct Collaborators {
    /// Lists candidate files
    pub enumerator: Arc<dyn Enumerator>,
    /// Computes content digests
    pub hasher: Arc<dyn ExactHasher>,
    /// Reports media metadata
    pub prober: Arc<dyn MetadataProber>,
    /// Produces perceptual signatures
    pub sampler: Arc<dyn PerceptualSampler>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            enumerator: Arc::new(WalkEnumerator::new()),
            hasher: Arc::new(Sha256Hasher::new()),
            prober: Arc::new(NullProber),
            sampler: Arc::new(NullProber),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Collaborators { .. }")
    }
}

impl Collaborators {
    /// Replace the enumerator.
    #[must_use]
    pub fn with_enumerator(mut self, enumerator: Arc<dyn Enumerator>) -> Self {
        self.enumerator = enumerator;
        self
    }

    /// Replace the hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn ExactHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replace the metadata prober.
    #[must_use]
    pub fn with_prober(mut self, prober: Arc<dyn MetadataProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Replace the perceptual sampler.
    #[must_use]
    pub fn with_sampler(mut self, sampler: Arc<dyn PerceptualSampler>) -> Self {
        self.sampler = sampler;
        self
    }
}

/// Summary statistics from a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Records that entered clustering
    pub total_files: usize,
    /// Total size of those records in bytes
    pub total_size: u64,
    /// Records carrying media metadata
    pub media_files: usize,
    /// Records carrying a perceptual signature
    pub signed_files: usize,
    /// Groups per strategy, in strategy order
    pub groups_by_strategy: Vec<(Strategy, usize)>,
    /// Total groups across strategies
    pub total_groups: usize,
    /// Distinct files planned for disposal
    pub total_losers: usize,
    /// Bytes reclaimed if the plan is executed
    pub reclaimable_bytes: u64,
    /// Wall time of the run
    #[serde(skip)]
    pub duration: Duration,
}

impl ScanSummary {
    /// Format reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_bytes).to_string()
    }
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Mode the run used
    pub mode: Mode,
    /// Root that was scanned (empty for record-only runs)
    pub root: PathBuf,
    /// Groups from all enabled strategies
    pub groups: Vec<Group>,
    /// One keeper decision per group
    pub dispositions: Vec<Disposition>,
    /// Distinct losers safe to dispose
    pub plan: DisposalPlan,
    /// Run statistics
    pub summary: ScanSummary,
    /// Per-file failures and notes
    pub diagnostics: Diagnostics,
}

/// Errors that end a run before clustering.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The run was interrupted (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The scan root does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The scan root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The enumerator found no files.
    #[error("No files matched under {0}")]
    NoFilesMatched(PathBuf),

    /// Enumeration failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// The clustering engine.
pub struct DedupeEngine {
    config: FinderConfig,
    collaborators: Collaborators,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl fmt::Debug for DedupeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupeEngine")
            .field("config", &self.config)
            .field("collaborators", &self.collaborators)
            .finish()
    }
}

impl DedupeEngine {
    /// Create an engine with the default collaborators.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self::with_collaborators(config, Collaborators::default())
    }

    /// Create an engine with custom collaborators.
    #[must_use]
    pub fn with_collaborators(config: FinderConfig, collaborators: Collaborators) -> Self {
        let threads = config.effective_threads();
        let pool = match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => Some(Arc::new(pool)),
            Err(e) => {
                log::warn!(
                    "Failed to create worker pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                None
            }
        };
        Self {
            config,
            collaborators,
            pool,
        }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    fn install<R: Send>(&self, work: impl FnOnce() -> R + Send) -> R {
        match self.pool {
            Some(ref pool) => pool.install(work),
            None => work(),
        }
    }

    fn check_interrupted(&self) -> Result<(), FinderError> {
        if self.config.is_shutdown_requested() {
            log::info!("Shutdown requested, stopping before clustering");
            return Err(FinderError::Interrupted);
        }
        Ok(())
    }

    /// Run the full pipeline on a directory tree.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if the root is missing or not a directory, if
    /// no files matched, or if the run was interrupted.
    pub fn find(&self, root: &Path) -> Result<ScanOutcome, FinderError> {
        let start = Instant::now();
        let mut diagnostics = Diagnostics::default();

        let root = resolve_root(root)?;
        let records = self.collect(&root, &mut diagnostics)?;
        let mut outcome = self.run_records(records, diagnostics, start)?;
        outcome.root = root;
        Ok(outcome)
    }

    /// Run preparation, clustering and selection on records built elsewhere.
    ///
    /// Records that already carry a hash or signature are not recomputed.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::Interrupted` if shutdown was requested.
    pub fn find_in_records(&self, records: Vec<Arc<FileRecord>>) -> Result<ScanOutcome, FinderError> {
        self.run_records(records, Diagnostics::default(), Instant::now())
    }

    fn run_records(
        &self,
        records: Vec<Arc<FileRecord>>,
        mut diagnostics: Diagnostics,
        start: Instant,
    ) -> Result<ScanOutcome, FinderError> {
        self.prepare(&records, &mut diagnostics)?;
        let groups = self.cluster(&records);

        let selector = WinnerSelector::new(self.config.keep_priority.clone());
        let dispositions = selector.select_all(&groups);
        let plan = DisposalPlan::from_dispositions(&dispositions);

        let mut groups_by_strategy: Vec<(Strategy, usize)> = Vec::new();
        for group in &groups {
            let strategy = group.id.strategy();
            match groups_by_strategy.iter_mut().find(|(s, _)| *s == strategy) {
                Some((_, count)) => *count += 1,
                None => groups_by_strategy.push((strategy, 1)),
            }
        }

        let summary = ScanSummary {
            total_files: records.len(),
            total_size: records.iter().map(|r| r.size).sum(),
            media_files: records.iter().filter(|r| r.media.is_some()).count(),
            signed_files: records.iter().filter(|r| !r.signature().is_empty()).count(),
            groups_by_strategy,
            total_groups: groups.len(),
            total_losers: plan.len(),
            reclaimable_bytes: plan.total_bytes(),
            duration: start.elapsed(),
        };

        log::info!(
            "Found {} group(s), {} file(s) to dispose, {} reclaimable",
            summary.total_groups,
            summary.total_losers,
            summary.reclaimable_display()
        );

        Ok(ScanOutcome {
            mode: self.config.mode,
            root: PathBuf::new(),
            groups,
            dispositions,
            plan,
            summary,
            diagnostics,
        })
    }

    /// Enumerate `root` and build one record per file.
    ///
    /// The root is made absolute first, so record paths are absolute even
    /// for a relative root.
    ///
    /// Media metadata is probed only when the mode needs it. Per-file stat
    /// and probe failures are recorded in `diagnostics`.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` for a missing root, a non-directory root, an
    /// enumeration failure, no matching files, or an interruption.
    pub fn collect(
        &self,
        root: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<Arc<FileRecord>>, FinderError> {
        let root = resolve_root(root)?;
        let root = root.as_path();

        let paths = self.collaborators.enumerator.enumerate(root)?;
        if paths.is_empty() {
            return Err(FinderError::NoFilesMatched(root.to_path_buf()));
        }
        log::info!("Collecting {} file(s) under {}", paths.len(), root.display());

        let needs_media = self.config.mode.needs_media();
        let prober = self.collaborators.prober.as_ref();
        let callback = self.config.progress_callback.as_ref();

        if let Some(cb) = callback {
            cb.on_phase_start("probe", paths.len());
        }

        type Collected = (Option<FileRecord>, Option<(PathBuf, FailureStage, String)>);
        let results: Vec<Collected> = self.install(|| {
            paths
                .par_iter()
                .enumerate()
                .map(|(idx, path)| {
                    if self.config.is_shutdown_requested() {
                        return (None, None);
                    }
                    if let Some(cb) = callback {
                        cb.on_progress(idx + 1, &path.to_string_lossy());
                    }

                    let record = match FileRecord::from_path(path) {
                        Ok(record) => record,
                        Err(e) => {
                            return (None, Some((path.clone(), FailureStage::Stat, e.to_string())))
                        }
                    };

                    if !needs_media {
                        return (Some(record), None);
                    }
                    match prober.probe(path) {
                        Ok(info) => (Some(record.with_media(info)), None),
                        Err(e) => (
                            Some(record),
                            Some((path.clone(), FailureStage::Probe, e.to_string())),
                        ),
                    }
                })
                .collect()
        });

        if let Some(cb) = callback {
            cb.on_phase_end("probe");
        }
        self.check_interrupted()?;

        let mut records = Vec::with_capacity(results.len());
        for (record, failure) in results {
            if let Some((path, stage, message)) = failure {
                log::warn!("{} failed for {}: {}", stage, path.display(), message);
                diagnostics.record_failure(stage, &path, &message);
            }
            if let Some(record) = record {
                records.push(Arc::new(record));
            }
        }

        if needs_media && !records.iter().any(|r| r.media.is_some()) {
            diagnostics.note("No media metadata available; metadata-based strategies have no candidates");
        }

        Ok(records)
    }

    /// Fill content hashes and perceptual signatures for the enabled
    /// strategies. Returns once every worker has finished.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::Interrupted` if shutdown was requested.
    pub fn prepare(
        &self,
        records: &[Arc<FileRecord>],
        diagnostics: &mut Diagnostics,
    ) -> Result<(), FinderError> {
        let mode = self.config.mode;

        if mode.uses_exact() {
            let grouper = self.exact_grouper();
            for (record, error) in grouper.hash_all(records) {
                log::warn!("Failed to hash {}: {}", record.path.display(), error);
                diagnostics.record_failure(FailureStage::Hash, &record.path, &error);
            }
        }

        if mode.uses_perceptual() {
            for (path, message) in self.sample_all(records) {
                log::warn!("Failed to sample frames of {}: {}", path.display(), message);
                diagnostics.record_failure(FailureStage::Sample, &path, &message);
            }
            if !records.iter().any(|r| !r.signature().is_empty()) {
                diagnostics.note("No perceptual signatures available; perceptual strategy has no candidates");
            }
        }

        self.check_interrupted()
    }

    fn exact_grouper(&self) -> ExactHashGrouper {
        let mut grouper = ExactHashGrouper::new(Arc::clone(&self.collaborators.hasher));
        if let Some(ref pool) = self.pool {
            grouper = grouper.with_pool(Arc::clone(pool));
        }
        if let Some(ref flag) = self.config.shutdown_flag {
            grouper = grouper.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            grouper = grouper.with_progress_callback(Arc::clone(callback));
        }
        grouper
    }

    fn sample_all(&self, records: &[Arc<FileRecord>]) -> Vec<(PathBuf, String)> {
        let sampler = self.collaborators.sampler.as_ref();
        let frames = self.config.perceptual.sample_frame_count;
        let callback = self.config.progress_callback.as_ref();

        if let Some(cb) = callback {
            cb.on_phase_start("sample", records.len());
        }

        let failures = self.install(|| {
            records
                .par_iter()
                .enumerate()
                .filter_map(|(idx, record)| {
                    if self.config.is_shutdown_requested() || !record.signature().is_empty() {
                        return None;
                    }
                    if let Some(cb) = callback {
                        cb.on_progress(idx + 1, &record.path.to_string_lossy());
                    }
                    match sampler.sample(&record.path, record.duration(), frames) {
                        Ok(signature) => {
                            if !signature.is_empty() {
                                record.set_signature(signature);
                            }
                            None
                        }
                        Err(e) => Some((record.path.clone(), e.to_string())),
                    }
                })
                .collect()
        });

        if let Some(cb) = callback {
            cb.on_phase_end("sample");
        }
        failures
    }

    /// Run the enabled strategies over prepared records.
    ///
    /// Strategies are independent passes: in `all` mode a record can be a
    /// member of one group per strategy.
    pub fn cluster(&self, records: &[Arc<FileRecord>]) -> Vec<Group> {
        let mode = self.config.mode;
        let mut groups = Vec::new();

        if mode.uses_exact() {
            // Hashes were filled by `prepare`; failures are already recorded.
            let exact = bucket_by_hash(records);
            log::info!("Exact hash: {} record(s) -> {} group(s)", records.len(), exact.len());
            groups.extend(exact);
        }
        if mode.uses_tolerance() {
            groups.extend(ToleranceClusterer::new(self.config.tolerance.clone()).cluster(records));
        }
        if mode.uses_perceptual() {
            groups.extend(PerceptualClusterer::new(self.config.perceptual.clone()).cluster(records));
        }
        groups
    }
}

/// Check `root` is an existing directory and return its canonical form.
fn resolve_root(root: &Path) -> Result<PathBuf, FinderError> {
    if !root.exists() {
        return Err(FinderError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(FinderError::NotADirectory(root.to_path_buf()));
    }
    root.canonicalize()
        .map_err(|e| FinderError::Scan(ScanError::from_io(root, e)))
}
