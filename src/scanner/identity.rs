//! On-disk file identity for hard links and followed symlinks.
//!
//! # Overview
//!
//! Two paths can name the same underlying file: hard links share an
//! inode, and a followed symlink resolves to its target. Such paths hash
//! identically but are not duplicates; removing one either frees nothing
//! or leaves the other dangling. [`FileIdentity`] captures the
//! `(device, inode)` pair so callers can recognise them.
//!
//! # Platform Support
//!
//! - **Unix**: `(dev, ino)` from file metadata
//! - **Other**: no identity is available and every path is treated as a
//!   distinct file
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::scanner::identity::IdentityTracker;
//! use std::path::Path;
//!
//! let mut tracker = IdentityTracker::new();
//! for path in [Path::new("/videos/a.mp4"), Path::new("/videos/link.mp4")] {
//!     if let Ok(meta) = std::fs::metadata(path) {
//!         if !tracker.first_sighting(&meta) {
//!             println!("Same file as an earlier path: {}", path.display());
//!         }
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::fs::Metadata;
use std::path::Path;

/// Identity of the file a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(not(unix))]
    _unsupported: (),
}

impl FileIdentity {
    /// Identity from already-fetched metadata.
    ///
    /// Returns `None` where the platform exposes no inode.
    #[cfg(unix)]
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    #[must_use]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    /// Identity of the file at `path`, following symlinks.
    ///
    /// Returns `None` if the file cannot be stat'ed or the platform has
    /// no inode concept.
    #[must_use]
    pub fn of_path(path: &Path) -> Option<Self> {
        std::fs::metadata(path)
            .ok()
            .and_then(|m| Self::from_metadata(&m))
    }

    /// Whether identity tracking works on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

/// Remembers which files have been seen.
///
/// Not thread-safe; the walker drives it from a single thread.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    seen: HashSet<FileIdentity>,
}

impl IdentityTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `metadata` and report whether this is the first path to the
    /// file.
    ///
    /// Always `true` when no identity is available.
    pub fn first_sighting(&mut self, metadata: &Metadata) -> bool {
        match FileIdentity::from_metadata(metadata) {
            Some(id) => self.seen.insert(id),
            None => true,
        }
    }

    /// Number of distinct files recorded.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
