//! Group model shared by all clustering strategies.
//!
//! A [`Group`] is a transient clustering result: an id tagged with the
//! strategy that produced it and the member records. Records are shared
//! (`Arc`) so the same file may be a member of groups from several
//! strategies in the same run.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::scanner::{hash_to_hex, FileRecord, Hash};

/// The clustering strategy that produced a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Identical SHA-256 content hash
    Exact,
    /// Metadata similarity within a duration tolerance
    Tolerance,
    /// Perceptual signature Hamming distance
    Perceptual,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Tolerance => write!(f, "tolerance"),
            Self::Perceptual => write!(f, "perceptual"),
        }
    }
}

/// Opaque group identifier tagged by strategy.
///
/// Renders as `hash:<hex digest>`, `meta:<n>` or `phash:<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupId {
    /// Exact-hash group keyed by digest
    Hash(Hash),
    /// n-th tolerance group of the run
    Meta(usize),
    /// n-th perceptual group of the run
    Phash(usize),
}

impl GroupId {
    /// Strategy that produced this id.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Hash(_) => Strategy::Exact,
            Self::Meta(_) => Strategy::Tolerance,
            Self::Phash(_) => Strategy::Perceptual,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash(hash) => write!(f, "hash:{}", hash_to_hex(hash)),
            Self::Meta(n) => write!(f, "meta:{n}"),
            Self::Phash(n) => write!(f, "phash:{n}"),
        }
    }
}

impl Serialize for GroupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A cluster of records judged equivalent under one strategy.
#[derive(Debug, Clone)]
pub struct Group {
    /// Strategy-tagged id
    pub id: GroupId,
    /// Member records (at least two; order not significant)
    pub members: Vec<Arc<FileRecord>>,
}

impl Group {
    /// Create a group.
    #[must_use]
    pub fn new(id: GroupId, members: Vec<Arc<FileRecord>>) -> Self {
        debug_assert!(members.len() >= 2, "group {id} has fewer than two members");
        Self { id, members }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total size of all members in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(|r| r.size).sum()
    }

    /// Member paths, for display.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|r| r.path.clone()).collect()
    }
}

/// Per-group decision: one keeper, every other member a loser.
#[derive(Debug, Clone)]
pub struct Disposition {
    /// Group the decision belongs to
    pub group_id: GroupId,
    /// The record retained
    pub keep: Arc<FileRecord>,
    /// All other members, each exactly once
    pub losers: Vec<Arc<FileRecord>>,
}

impl Disposition {
    /// Bytes freed if every loser were removed.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.losers.iter().map(|r| r.size).sum()
    }

    /// Loser paths.
    #[must_use]
    pub fn loser_paths(&self) -> Vec<PathBuf> {
        self.losers.iter().map(|r| r.path.clone()).collect()
    }
}
