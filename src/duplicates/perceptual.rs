//! Perceptual signature clustering.
//!
//! Each media record may carry a signature: one packed perceptual hash
//! per sampled frame. Two signatures are compared over their overlapping
//! prefix of `L` frames; they match when the summed Hamming distance is at
//! most `threshold_per_frame * L`. Fewer than two overlapping frames is not
//! enough evidence and never matches.
//!
//! Two linkage policies are available:
//! - [`PerceptualLinkage::Anchored`] (default): greedy single pass. Each
//!   unvisited record seeds a group and absorbs every later unvisited
//!   record that matches the *seed*. Members are not checked against each
//!   other, and the result depends on input order.
//! - [`PerceptualLinkage::Transitive`]: union-find over all matching pairs,
//!   the same closure the tolerance strategy uses.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::groups::{Group, GroupId};
use super::union_find::UnionFind;
use crate::scanner::{FileRecord, FrameHash};

/// Minimum overlapping frames for a comparison to count.
pub const MIN_OVERLAP_FRAMES: usize = 2;

/// How matching pairs are linked into groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualLinkage {
    /// Greedy grouping around the first unvisited record
    #[default]
    Anchored,
    /// Full transitive closure over matching pairs
    Transitive,
}

impl fmt::Display for PerceptualLinkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anchored => write!(f, "anchored"),
            Self::Transitive => write!(f, "transitive"),
        }
    }
}

/// Hamming distance between two frame hashes.
#[must_use]
pub fn hamming(a: FrameHash, b: FrameHash) -> u32 {
    (a ^ b).count_ones()
}

/// Summed Hamming distance over the overlapping prefix.
///
/// Returns `(distance, overlap)`.
#[must_use]
pub fn signature_distance(a: &[FrameHash], b: &[FrameHash]) -> (u64, usize) {
    let overlap = a.len().min(b.len());
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| u64::from(hamming(*x, *y)))
        .sum();
    (distance, overlap)
}

/// Whether two signatures are visually similar under `threshold_per_frame`.
#[must_use]
pub fn signatures_match(a: &[FrameHash], b: &[FrameHash], threshold_per_frame: u32) -> bool {
    let (distance, overlap) = signature_distance(a, b);
    if overlap < MIN_OVERLAP_FRAMES {
        return false;
    }
    distance <= u64::from(threshold_per_frame) * overlap as u64
}

/// Parameters of perceptual clustering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerceptualConfig {
    /// Hamming distance budget per compared frame
    pub threshold_per_frame: u32,
    /// Frames sampled per file
    pub sample_frame_count: usize,
    /// Linkage policy
    pub linkage: PerceptualLinkage,
}

impl Default for PerceptualConfig {
    fn default() -> Self {
        Self {
            threshold_per_frame: 10,
            sample_frame_count: 5,
            linkage: PerceptualLinkage::default(),
        }
    }
}

/// Groups records by perceptual signature distance.
#[derive(Debug, Clone, Default)]
pub struct PerceptualClusterer {
    config: PerceptualConfig,
}

impl PerceptualClusterer {
    /// Create a clusterer.
    #[must_use]
    pub fn new(config: PerceptualConfig) -> Self {
        Self { config }
    }

    /// Cluster the records that carry a non-empty signature.
    ///
    /// Groups are numbered `phash:0..` in the order they are formed.
    #[must_use]
    pub fn cluster(&self, records: &[Arc<FileRecord>]) -> Vec<Group> {
        let candidates: Vec<&Arc<FileRecord>> = records
            .iter()
            .filter(|r| !r.signature().is_empty())
            .collect();

        let components = match self.config.linkage {
            PerceptualLinkage::Anchored => self.anchored(&candidates),
            PerceptualLinkage::Transitive => self.transitive(&candidates),
        };

        let groups: Vec<Group> = components
            .into_iter()
            .enumerate()
            .map(|(n, ids)| {
                let members = ids.into_iter().map(|id| Arc::clone(candidates[id])).collect();
                Group::new(GroupId::Phash(n), members)
            })
            .collect();

        log::info!(
            "Perceptual ({}): {} signed record(s) -> {} group(s)",
            self.config.linkage,
            candidates.len(),
            groups.len()
        );
        groups
    }

    fn matches(&self, a: &FileRecord, b: &FileRecord) -> bool {
        let matched = signatures_match(a.signature(), b.signature(), self.config.threshold_per_frame);
        if matched {
            log::trace!(
                "Perceptual match: {} ~ {}",
                a.path.display(),
                b.path.display()
            );
        }
        matched
    }

    fn anchored(&self, candidates: &[&Arc<FileRecord>]) -> Vec<Vec<usize>> {
        let mut visited = vec![false; candidates.len()];
        let mut components = Vec::new();

        for seed in 0..candidates.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            let mut members = vec![seed];

            for other in seed + 1..candidates.len() {
                if !visited[other] && self.matches(candidates[seed], candidates[other]) {
                    visited[other] = true;
                    members.push(other);
                }
            }

            if members.len() >= 2 {
                components.push(members);
            }
        }
        components
    }

    fn transitive(&self, candidates: &[&Arc<FileRecord>]) -> Vec<Vec<usize>> {
        let mut uf = UnionFind::new(candidates.len());
        for a in 0..candidates.len() {
            for b in a + 1..candidates.len() {
                if self.matches(candidates[a], candidates[b]) {
                    uf.union(a, b);
                }
            }
        }
        uf.components(2)
    }
}
