//! File records and the collaborators that produce them.
//!
//! This module provides:
//! - The per-file record model ([`FileRecord`], [`MediaInfo`])
//! - Content hashing with SHA-256 ([`hasher`])
//! - Directory enumeration with depth and glob filtering ([`walker`])
//! - Hard link and symlink identity ([`identity`])
//! - Media metadata and perceptual signature sources ([`probe`])
//!
//! # Architecture
//!
//! Records are built once per run from collaborator output and are
//! immutable afterwards, except for two write-once caches: the content
//! hash and the perceptual signature. Both live in a [`OnceLock`] so a
//! record can be shared across worker threads and strategies as an
//! `Arc<FileRecord>`.
//!
//! # Example
//!
//! ```no_run
//! use mediadupe::scanner::{FileRecord, Sha256Hasher};
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let record = FileRecord::new(PathBuf::from("/videos/a.mp4"), 1024, SystemTime::now());
//! let hasher = Sha256Hasher::new();
//!
//! // The first call reads the file, later calls reuse the cached digest.
//! if let Ok(hash) = record.content_hash_with(&hasher) {
//!     println!("{}", mediadupe::scanner::hash_to_hex(&hash));
//! }
//! ```

pub mod hasher;
pub mod identity;
pub mod probe;
pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub use hasher::{hash_to_hex, ExactHasher, Hash, Sha256Hasher};
pub use identity::{FileIdentity, IdentityTracker};
pub use probe::{ManifestProber, MetadataProber, NullProber, PerceptualSampler};
pub use walker::{Enumerator, WalkEnumerator};

/// One packed perceptual hash of a sampled frame.
pub type FrameHash = u64;

/// Media metadata reported by a [`MetadataProber`].
///
/// Every field is optional: a prober that cannot read the file returns
/// `MediaInfo::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds; `None` means unknown
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Frame width in pixels
    #[serde(default)]
    pub width: Option<u32>,
    /// Frame height in pixels
    #[serde(default)]
    pub height: Option<u32>,
    /// Container format name (e.g. "mp4", "matroska")
    #[serde(default)]
    pub container: Option<String>,
    /// Video codec name (e.g. "h264")
    #[serde(default)]
    pub video_codec: Option<String>,
    /// Audio codec name (e.g. "aac")
    #[serde(default)]
    pub audio_codec: Option<String>,
    /// Overall bitrate in bits per second
    #[serde(default)]
    pub overall_bitrate_bps: Option<u64>,
    /// Video stream bitrate in bits per second
    #[serde(default)]
    pub video_bitrate_bps: Option<u64>,
}

impl MediaInfo {
    /// Normalise values a prober may report but the engine cannot use.
    ///
    /// NaN, infinite and negative durations become unknown, and a zero
    /// width or height becomes unknown.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.duration_seconds = self
            .duration_seconds
            .filter(|d| d.is_finite() && *d >= 0.0);
        self.width = self.width.filter(|w| *w > 0);
        self.height = self.height.filter(|h| *h > 0);
        self
    }

    /// Whether the prober returned anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `width * height` when both are known, else 0.
    #[must_use]
    pub fn resolution_area(&self) -> u64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) => u64::from(w) * u64::from(h),
            _ => 0,
        }
    }
}

/// Identity, filesystem facts and cached derived values for one path.
#[derive(Debug)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Media metadata, present only for files probed as media
    pub media: Option<MediaInfo>,
    content_hash: OnceLock<Option<Hash>>,
    signature: OnceLock<Vec<FrameHash>>,
}

impl FileRecord {
    /// Create a record with empty caches and no media metadata.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
            media: None,
            content_hash: OnceLock::new(),
            signature: OnceLock::new(),
        }
    }

    /// Attach probed media metadata.
    ///
    /// An all-`None` probe result leaves the record as a plain file.
    #[must_use]
    pub fn with_media(mut self, info: MediaInfo) -> Self {
        let info = info.sanitized();
        self.media = if info.is_empty() { None } else { Some(info) };
        self
    }

    /// Build a record from the filesystem metadata of `path`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` if the path cannot be stat'ed.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let metadata = std::fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Ok(Self::new(path.to_path_buf(), metadata.len(), modified))
    }

    /// Duration in seconds, if the record is media with a known duration.
    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.media.as_ref().and_then(|m| m.duration_seconds)
    }

    /// Resolution area, 0 when unknown or not media.
    #[must_use]
    pub fn resolution_area(&self) -> u64 {
        self.media.as_ref().map_or(0, MediaInfo::resolution_area)
    }

    /// Number of path components.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.components().count()
    }

    /// The cached content hash, if one was computed successfully.
    #[must_use]
    pub fn content_hash(&self) -> Option<Hash> {
        self.content_hash.get().copied().flatten()
    }

    /// Whether a hash attempt (successful or not) has already been made.
    #[must_use]
    pub fn is_hash_attempted(&self) -> bool {
        self.content_hash.get().is_some()
    }

    /// Return the content hash, computing it with `hasher` on first use.
    ///
    /// The outcome is memoised either way: once a hash attempt failed,
    /// later calls return [`HashError::PreviouslyFailed`] without touching
    /// the file again.
    ///
    /// # Errors
    ///
    /// Returns the hasher's error on the first failure.
    pub fn content_hash_with<H: ExactHasher + ?Sized>(&self, hasher: &H) -> Result<Hash, HashError> {
        if let Some(cached) = self.content_hash.get() {
            return cached.ok_or_else(|| HashError::PreviouslyFailed(self.path.clone()));
        }

        let result = hasher.hash_file(&self.path);
        // A concurrent writer would have produced the same value for the same file.
        let _ = self.content_hash.set(result.as_ref().ok().copied());
        result
    }

    /// The cached perceptual signature, empty if none was sampled.
    #[must_use]
    pub fn signature(&self) -> &[FrameHash] {
        self.signature.get().map_or(&[], Vec::as_slice)
    }

    /// Store the perceptual signature. Returns `false` if one was already set.
    pub fn set_signature(&self, signature: Vec<FrameHash>) -> bool {
        self.signature.set(signature).is_ok()
    }
}

/// Errors that can occur while enumerating or stat'ing files.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The glob pattern could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern as given by the user
        pattern: String,
        /// Matcher error message
        message: String,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    pub(crate) fn from_io(path: &Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An earlier attempt in this run already failed for this file.
    #[error("Hashing previously failed: {0}")]
    PreviouslyFailed(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by media probing or frame sampling collaborators.
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    /// The collaborator could not read the file.
    #[error("Probe failed for {path}: {message}")]
    Failed {
        /// File being probed
        path: PathBuf,
        /// Collaborator message
        message: String,
    },

    /// A media manifest could not be loaded.
    #[error("Invalid media manifest {path}: {message}")]
    Manifest {
        /// Manifest file
        path: PathBuf,
        /// Parse or read error
        message: String,
    },
}
