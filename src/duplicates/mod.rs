//! Duplicate clustering module.
//!
//! This module provides functionality for:
//! - Exact grouping by content hash ([`ExactHashGrouper`])
//! - Tolerance clustering over media metadata ([`ToleranceClusterer`])
//! - Perceptual clustering over frame signatures ([`PerceptualClusterer`])
//! - Keeper selection ([`WinnerSelector`])
//! - Pipeline orchestration ([`DedupeEngine`])

pub mod diagnostics;
pub mod exact;
pub mod finder;
pub mod groups;
pub mod perceptual;
pub mod selector;
pub mod tolerance;
pub mod union_find;

pub use diagnostics::{Diagnostics, FailureStage, FileFailure};
pub use exact::{bucket_by_hash, ExactHashGrouper};
pub use finder::{
    Collaborators, DedupeEngine, FinderConfig, FinderError, Mode, ScanOutcome, ScanSummary,
};
pub use groups::{Disposition, Group, GroupId, Strategy};
pub use perceptual::{
    hamming, signature_distance, signatures_match, PerceptualClusterer, PerceptualConfig,
    PerceptualLinkage,
};
pub use selector::{KeepCriterion, UnknownCriterion, WinnerSelector};
pub use tolerance::{ToleranceClusterer, ToleranceConfig};
pub use union_find::UnionFind;
