//! Media metadata and perceptual signature sources.
//!
//! The engine never runs external media tools itself. It asks a
//! [`MetadataProber`] for duration/resolution/codec facts and a
//! [`PerceptualSampler`] for per-frame perceptual hashes. Both return
//! `Ok` with an empty value when the information is simply unavailable,
//! and `Err` only for a per-file failure worth recording.
//!
//! Two implementations ship with the crate:
//! - [`NullProber`]: always "unavailable" (exact-hash runs)
//! - [`ManifestProber`]: reads precomputed facts from a JSON manifest
//!
//! # Manifest format
//!
//! ```json
//! {
//!   "files": {
//!     "clips/a.mp4": {
//!       "duration_seconds": 12.5,
//!       "width": 1920,
//!       "height": 1080,
//!       "video_codec": "h264",
//!       "signature": [1234567890, 987654321]
//!     }
//!   }
//! }
//! ```
//!
//! Relative keys resolve against the manifest's directory.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use super::{FrameHash, MediaInfo, ProbeError};

/// Reports media metadata for a file.
pub trait MetadataProber: Send + Sync {
    /// Probe `path`. Returns `MediaInfo::default()` if the file is not media
    /// or probing is unavailable.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` for a recoverable per-file failure.
    fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

/// Produces per-frame perceptual hashes for a file.
pub trait PerceptualSampler: Send + Sync {
    /// Sample up to `frames` frame hashes from `path`. An empty vector means
    /// visual sampling is unavailable for this file.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` for a recoverable per-file failure.
    fn sample(
        &self,
        path: &Path,
        duration: Option<f64>,
        frames: usize,
    ) -> Result<Vec<FrameHash>, ProbeError>;
}

/// Prober that never has anything to report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProber;

impl MetadataProber for NullProber {
    fn probe(&self, _path: &Path) -> Result<MediaInfo, ProbeError> {
        Ok(MediaInfo::default())
    }
}

impl PerceptualSampler for NullProber {
    fn sample(
        &self,
        _path: &Path,
        _duration: Option<f64>,
        _frames: usize,
    ) -> Result<Vec<FrameHash>, ProbeError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    files: HashMap<PathBuf, ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestEntry {
    #[serde(flatten)]
    media: MediaInfo,
    #[serde(default)]
    signature: Vec<FrameHash>,
    #[serde(default)]
    error: Option<String>,
}

/// Media facts loaded from a precomputed JSON manifest.
///
/// An entry may carry an `"error"` string, which is reported as a
/// per-file probe failure.
#[derive(Debug, Clone, Default)]
pub struct ManifestProber {
    entries: HashMap<PathBuf, ManifestEntry>,
}

impl ManifestProber {
    /// Load a manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::Manifest` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ProbeError> {
        let manifest_err = |message: String| ProbeError::Manifest {
            path: path.to_path_buf(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| manifest_err(e.to_string()))?;
        let absolute = std::fs::canonicalize(path).map_err(|e| manifest_err(e.to_string()))?;
        let base = absolute.parent().unwrap_or(Path::new("/"));
        let prober = Self::from_json(&content, base).map_err(|e| manifest_err(e.to_string()))?;

        log::info!(
            "Loaded media manifest {} ({} entries)",
            path.display(),
            prober.len()
        );
        Ok(prober)
    }

    /// Parse a manifest, resolving relative keys against `base`.
    ///
    /// Keys naming existing files are canonicalized so they match the
    /// absolute paths the engine probes.
    ///
    /// # Errors
    ///
    /// Returns the JSON parse error.
    pub fn from_json(content: &str, base: &Path) -> Result<Self, serde_json::Error> {
        let manifest: ManifestFile = serde_json::from_str(content)?;
        let entries = manifest
            .files
            .into_iter()
            .map(|(key, entry)| (resolve_key(base, key), entry))
            .collect();
        Ok(Self { entries })
    }

    /// Number of manifest entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, path: &Path) -> Result<Option<&ManifestEntry>, ProbeError> {
        match self.entries.get(path) {
            Some(entry) => match entry.error {
                Some(ref message) => Err(ProbeError::Failed {
                    path: path.to_path_buf(),
                    message: message.clone(),
                }),
                None => Ok(Some(entry)),
            },
            None => Ok(None),
        }
    }
}

fn resolve_key(base: &Path, key: PathBuf) -> PathBuf {
    let joined = if key.is_absolute() { key } else { base.join(key) };
    std::fs::canonicalize(&joined).unwrap_or_else(|_| {
        joined
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    })
}

impl MetadataProber for ManifestProber {
    fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        Ok(self
            .entry(path)?
            .map(|e| e.media.clone())
            .unwrap_or_default())
    }
}

impl PerceptualSampler for ManifestProber {
    fn sample(
        &self,
        path: &Path,
        _duration: Option<f64>,
        frames: usize,
    ) -> Result<Vec<FrameHash>, ProbeError> {
        Ok(self
            .entry(path)?
            .map(|e| e.signature.iter().copied().take(frames).collect())
            .unwrap_or_default())
    }
}
