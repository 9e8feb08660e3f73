//! Directory enumeration with depth and glob filtering.
//!
//! # Overview
//!
//! The [`Enumerator`] trait is the boundary the engine depends on: it yields
//! an ordered list of absolute file paths under a root. [`WalkEnumerator`]
//! is the stock implementation built on `walkdir`, with glob filtering from
//! the `ignore` crate's override matcher.
//!
//! Each underlying file is listed once: a hard link or a followed symlink
//! to a file already listed is skipped.
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::scanner::{Enumerator, WalkEnumerator};
//! use std::path::Path;
//!
//! let walker = WalkEnumerator::new().with_max_depth(Some(2)).with_pattern(Some("*.mp4".into()));
//! for path in walker.enumerate(Path::new("/videos")).unwrap() {
//!     println!("{}", path.display());
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};
use walkdir::WalkDir;

use super::identity::IdentityTracker;
use super::ScanError;

/// Produces the candidate file paths for a run.
pub trait Enumerator: Send + Sync {
    /// List files under `root`, already filtered.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` if the root cannot be read or the filter is invalid.
    /// Unreadable entries below the root are skipped with a warning.
    fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError>;
}

/// Walks a directory tree with `walkdir`.
#[derive(Debug, Clone, Default)]
pub struct WalkEnumerator {
    /// Maximum recursion depth below the root (`None` = unlimited).
    /// Depth 1 means files directly in the root.
    pub max_depth: Option<usize>,
    /// Glob pattern matched against the path relative to the root.
    pub pattern: Option<String>,
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,
}

impl WalkEnumerator {
    /// Create an enumerator with no depth limit and no pattern.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit recursion depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Only yield files matching `pattern`.
    #[must_use]
    pub fn with_pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    /// Follow symbolic links.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    fn build_matcher(&self, root: &Path) -> Result<Option<Override>, ScanError> {
        let Some(pattern) = self.pattern.as_deref() else {
            return Ok(None);
        };

        let invalid = |e: ignore::Error| ScanError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        };

        let mut builder = OverrideBuilder::new(root);
        builder.add(pattern).map_err(invalid)?;
        builder.build().map(Some).map_err(invalid)
    }
}

impl Enumerator for WalkEnumerator {
    fn enumerate(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let matcher = self.build_matcher(root)?;

        let mut walk = WalkDir::new(root).follow_links(self.follow_symlinks);
        if let Some(depth) = self.max_depth {
            walk = walk.max_depth(depth);
        }

        // (path, reached through a symlink)
        let mut candidates: Vec<(PathBuf, bool)> = Vec::new();
        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if e.depth() == 0 {
                        let path = e.path().unwrap_or(root).to_path_buf();
                        return Err(match e.into_io_error() {
                            Some(io) => ScanError::from_io(&path, io),
                            None => ScanError::NotFound(path),
                        });
                    }
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(ref matcher) = matcher {
                if !matcher.matched(entry.path(), false).is_whitelist() {
                    log::trace!("Pattern excluded: {}", entry.path().display());
                    continue;
                }
            }

            let via_symlink = entry.path_is_symlink();
            candidates.push((entry.into_path(), via_symlink));
        }

        let mut paths = dedupe_identities(candidates);
        paths.sort();
        log::debug!("Enumerated {} file(s) under {}", paths.len(), root.display());
        Ok(paths)
    }
}

/// Keep one path per underlying file.
///
/// Hard links and followed symlinks resolve to a file already listed; the
/// later path is dropped. Real entries claim their file before symlinks
/// do, so a symlink never stands in for its own target. Paths that cannot
/// be stat'ed are kept so the failure surfaces when the record is built.
fn dedupe_identities(mut candidates: Vec<(PathBuf, bool)>) -> Vec<PathBuf> {
    candidates.sort();
    let (direct, linked): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|(_, link)| !link);

    let mut tracker = IdentityTracker::new();
    let mut paths = Vec::with_capacity(direct.len() + linked.len());
    for (path, _) in direct.into_iter().chain(linked) {
        if let Ok(metadata) = fs::metadata(&path) {
            if !tracker.first_sighting(&metadata) {
                log::debug!("Skipping second path to the same file: {}", path.display());
                continue;
            }
        }
        paths.push(path);
    }
    paths
}
