//! Tolerance clustering over media metadata.
//!
//! # Overview
//!
//! [`ToleranceClusterer`] groups media records whose durations differ by
//! at most `duration_tolerance_seconds`, optionally also requiring equal
//! resolution, video codec and container.
//!
//! ## Bucketing
//!
//! Records are bucketed by `floor(duration / max(1, tolerance))`. Two
//! records within the tolerance are at most one bucket apart, so each
//! record is only compared with its own bucket and the next one (the
//! previous bucket is covered by symmetry). Comparing across the boundary
//! is what keeps 9.9 s and 10.1 s together at a 0.5 s tolerance.
//!
//! ## Transitive closure
//!
//! Similar pairs are merged with union-find, so chained near-duplicates
//! collapse into one group: with a 0.5 s tolerance, 10.0 s, 10.4 s and
//! 10.8 s end up together although the outer pair is 0.8 s apart.
//!
//! Records with unknown duration never join a tolerance group.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::groups::{Group, GroupId};
use super::union_find::UnionFind;
use crate::scanner::{FileRecord, MediaInfo};

/// Parameters of the similarity predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Maximum duration difference in seconds (>= 0)
    pub duration_tolerance_seconds: f64,
    /// Require identical width and height
    pub require_same_resolution: bool,
    /// Require identical video codec
    pub require_same_codec: bool,
    /// Require identical container
    pub require_same_container: bool,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            duration_tolerance_seconds: 1.0,
            require_same_resolution: false,
            require_same_codec: false,
            require_same_container: false,
        }
    }
}

impl ToleranceConfig {
    /// Width of one duration bucket in seconds.
    #[must_use]
    pub fn bucket_width(&self) -> f64 {
        self.duration_tolerance_seconds.max(1.0)
    }

    /// Bucket index for a known duration.
    ///
    /// Durations past the `i64` range share the last bucket.
    #[must_use]
    pub fn bucket_of(&self, duration: f64) -> i64 {
        (duration / self.bucket_width()).floor() as i64
    }

    /// Pairwise similarity predicate. Symmetric.
    ///
    /// Optional attributes compared under a `require_same_*` flag must be
    /// known on both sides.
    #[must_use]
    pub fn similar(&self, a: &MediaInfo, b: &MediaInfo) -> bool {
        let (Some(da), Some(db)) = (a.duration_seconds, b.duration_seconds) else {
            return false;
        };
        if (da - db).abs() > self.duration_tolerance_seconds {
            return false;
        }
        if self.require_same_resolution
            && !(both_equal(&a.width, &b.width) && both_equal(&a.height, &b.height))
        {
            return false;
        }
        if self.require_same_codec && !both_equal(&a.video_codec, &b.video_codec) {
            return false;
        }
        if self.require_same_container && !both_equal(&a.container, &b.container) {
            return false;
        }
        true
    }
}

fn both_equal<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// Groups media records by tolerant metadata similarity.
#[derive(Debug, Clone, Default)]
pub struct ToleranceClusterer {
    config: ToleranceConfig,
}

impl ToleranceClusterer {
    /// Create a clusterer with the given predicate parameters.
    #[must_use]
    pub fn new(config: ToleranceConfig) -> Self {
        Self { config }
    }

    /// Predicate parameters in use.
    #[must_use]
    pub fn config(&self) -> &ToleranceConfig {
        &self.config
    }

    /// Cluster `records`. Non-media records and unknown durations are ignored.
    ///
    /// Groups are numbered `meta:0..` in order of their first member's
    /// position in `records`.
    #[must_use]
    pub fn cluster(&self, records: &[Arc<FileRecord>]) -> Vec<Group> {
        // Arena of candidates: (record, media) with a known duration.
        let candidates: Vec<(&Arc<FileRecord>, &MediaInfo, f64)> = records
            .iter()
            .filter_map(|r| {
                let media = r.media.as_ref()?;
                let duration = media.duration_seconds?;
                Some((r, media, duration))
            })
            .collect();

        let unknown = records.len() - candidates.len();
        if unknown > 0 {
            log::debug!(
                "Tolerance: {} record(s) without a known duration skipped",
                unknown
            );
        }

        let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (id, (_, _, duration)) in candidates.iter().enumerate() {
            buckets
                .entry(self.config.bucket_of(*duration))
                .or_default()
                .push(id);
        }

        let mut uf = UnionFind::new(candidates.len());
        let mut comparisons = 0usize;

        for (&bucket, members) in &buckets {
            let next = bucket.checked_add(1).and_then(|n| buckets.get(&n));
            for (pos, &a) in members.iter().enumerate() {
                let same_bucket = members[pos + 1..].iter();
                let neighbor = next.into_iter().flatten();
                for &b in same_bucket.chain(neighbor) {
                    comparisons += 1;
                    if self.config.similar(candidates[a].1, candidates[b].1) {
                        log::trace!(
                            "Tolerance match: {} ~ {}",
                            candidates[a].0.path.display(),
                            candidates[b].0.path.display()
                        );
                        uf.union(a, b);
                    }
                }
            }
        }

        let groups: Vec<Group> = uf
            .components(2)
            .into_iter()
            .enumerate()
            .map(|(n, ids)| {
                let members = ids.into_iter().map(|id| Arc::clone(candidates[id].0)).collect();
                Group::new(GroupId::Meta(n), members)
            })
            .collect();

        log::info!(
            "Tolerance: {} candidate(s), {} bucket(s), {} comparison(s) -> {} group(s)",
            candidates.len(),
            buckets.len(),
            comparisons,
            groups.len()
        );
        groups
    }
}
