//! Exact content-hash grouping.
//!
//! # Overview
//!
//! [`ExactHashGrouper`] hashes every record (in parallel on a bounded
//! rayon pool) and buckets records by digest. Only buckets with two or
//! more members become groups. A file that cannot be hashed is left out
//! of this strategy's output and recorded in [`Diagnostics`]; the run
//! continues.
//!
//! Hashes are memoised on the record, so a record hashed earlier in the
//! run (or by a previous call) is never read again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::diagnostics::{Diagnostics, FailureStage};
use super::groups::{Group, GroupId};
use crate::progress::ProgressCallback;
use crate::scanner::{ExactHasher, FileRecord, Hash, HashError};

/// Groups records by identical content hash.
pub struct ExactHashGrouper {
    hasher: Arc<dyn ExactHasher>,
    pool: Option<Arc<rayon::ThreadPool>>,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ExactHashGrouper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactHashGrouper")
            .field("pool", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl ExactHashGrouper {
    /// Create a grouper using the global rayon pool.
    #[must_use]
    pub fn new(hasher: Arc<dyn ExactHasher>) -> Self {
        Self {
            hasher,
            pool: None,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Run hashing on a dedicated worker pool.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<rayon::ThreadPool>) -> Self {
        self.pool = Some(pool);
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

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Fill the content hash cache of every record.
    ///
    /// Returns the per-file failures; interrupted files are not reported
    /// as failures.
    pub fn hash_all(&self, records: &[Arc<FileRecord>]) -> Vec<(Arc<FileRecord>, HashError)> {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("hash", records.len());
        }

        let work = || {
            records
                .par_iter()
                .enumerate()
                .filter_map(|(idx, record)| {
                    if self.is_shutdown_requested() {
                        return None;
                    }
                    let result = record.content_hash_with(self.hasher.as_ref());
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(idx + 1, &record.path.to_string_lossy());
                        callback.on_item_completed(record.size);
                    }
                    result.err().map(|e| (Arc::clone(record), e))
                })
                .collect::<Vec<_>>()
        };

        let failures = match self.pool {
            Some(ref pool) => pool.install(work),
            None => work(),
        };

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("hash");
        }
        failures
    }

    /// Hash all records and group those with identical digests.
    ///
    /// Groups are ordered by the position of their first member in
    /// `records`, so output is deterministic for a fixed input order.
    pub fn group(&self, records: &[Arc<FileRecord>], diagnostics: &mut Diagnostics) -> Vec<Group> {
        for (record, error) in self.hash_all(records) {
            if matches!(error, HashError::PreviouslyFailed(_)) {
                continue;
            }
            log::warn!("Failed to hash {}: {}", record.path.display(), error);
            diagnostics.record_failure(FailureStage::Hash, &record.path, &error);
        }

        let groups = bucket_by_hash(records);
        log::info!(
            "Exact hash: {} record(s) -> {} group(s)",
            records.len(),
            groups.len()
        );
        groups
    }
}

/// Bucket records by their cached content hash.
///
/// Records without a cached hash are skipped.
#[must_use]
pub fn bucket_by_hash(records: &[Arc<FileRecord>]) -> Vec<Group> {
    let mut order: Vec<Hash> = Vec::new();
    let mut buckets: HashMap<Hash, Vec<Arc<FileRecord>>> = HashMap::new();

    for record in records {
        let Some(hash) = record.content_hash() else {
            continue;
        };
        let bucket = buckets.entry(hash).or_default();
        if bucket.is_empty() {
            order.push(hash);
        }
        bucket.push(Arc::clone(record));
    }

    order
        .into_iter()
        .filter_map(|hash| {
            let members = buckets.remove(&hash)?;
            if members.len() < 2 {
                log::trace!("Unique hash: {}", members[0].path.display());
                return None;
            }
            Some(Group::new(GroupId::Hash(hash), members))
        })
        .collect()
}
