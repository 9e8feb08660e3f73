//! Layered configuration and validation.
//!
//! Settings are merged with `figment`, later layers winning:
//! 1. built-in defaults
//! 2. TOML file (`--config PATH`, or `config.toml` in the platform config dir)
//! 3. environment variables prefixed with `MEDIADUPE_`
//! 4. command-line flags
//!
//! The merged [`Settings`] are then validated into an [`EngineConfig`]
//! before any file I/O happens.
//!
//! # Example TOML
//!
//! ```toml
//! mode = "all"
//! duration_tolerance_seconds = 0.5
//! require_same_resolution = true
//! keep_priority = ["resolution", "newer"]
//! quarantine_root = "/backup/dupes"
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::DisposeConfig;
use crate::duplicates::{
    FinderConfig, KeepCriterion, Mode, PerceptualConfig, PerceptualLinkage, ToleranceConfig,
    UnknownCriterion, WinnerSelector,
};
use crate::scanner::WalkEnumerator;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MEDIADUPE_";

/// Configuration errors. All are raised before any file I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A keep criterion name is not recognised.
    #[error(transparent)]
    UnknownCriterion(#[from] UnknownCriterion),

    /// Duration tolerance is negative or not finite.
    #[error("duration tolerance must be a finite number >= 0, got {0}")]
    InvalidTolerance(f64),

    /// Zero frames requested for a perceptual run.
    #[error("perceptual frame count must be at least 1 when perceptual grouping is enabled")]
    InvalidFrameCount,

    /// The glob pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),

    /// The merged layers could not be deserialised.
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
}

/// Raw settings as merged from all layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Grouping strategies to run
    pub mode: Mode,
    /// Maximum duration difference for tolerance grouping
    pub duration_tolerance_seconds: f64,
    /// Tolerance grouping requires equal resolution
    pub require_same_resolution: bool,
    /// Tolerance grouping requires equal video codec
    pub require_same_codec: bool,
    /// Tolerance grouping requires equal container
    pub require_same_container: bool,
    /// Frames sampled per file for perceptual grouping
    pub perceptual_frame_count: usize,
    /// Hamming distance budget per frame
    pub perceptual_threshold_per_frame: u32,
    /// Perceptual linkage policy
    pub perceptual_linkage: PerceptualLinkage,
    /// Keeper preference order, by criterion name
    pub keep_priority: Vec<String>,
    /// Worker threads (0 = available CPUs)
    pub threads: usize,
    /// Maximum directory depth
    pub max_depth: Option<usize>,
    /// Glob pattern filter
    pub pattern: Option<String>,
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// JSON manifest of media metadata and signatures
    pub media_manifest: Option<PathBuf>,
    /// Report disposals without touching files
    pub dry_run: bool,
    /// Skip per-file confirmation
    pub force: bool,
    /// Move losers here instead of deleting
    pub quarantine_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let tolerance = ToleranceConfig::default();
        let perceptual = PerceptualConfig::default();
        Self {
            mode: Mode::default(),
            duration_tolerance_seconds: tolerance.duration_tolerance_seconds,
            require_same_resolution: tolerance.require_same_resolution,
            require_same_codec: tolerance.require_same_codec,
            require_same_container: tolerance.require_same_container,
            perceptual_frame_count: perceptual.sample_frame_count,
            perceptual_threshold_per_frame: perceptual.threshold_per_frame,
            perceptual_linkage: perceptual.linkage,
            keep_priority: WinnerSelector::default()
                .priority()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            threads: 0,
            max_depth: None,
            pattern: None,
            follow_symlinks: false,
            media_manifest: None,
            dry_run: false,
            force: false,
            quarantine_root: None,
        }
    }
}

/// Values set on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_tolerance_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_same_resolution: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_same_codec: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_same_container: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perceptual_frame_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perceptual_threshold_per_frame: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perceptual_linkage: Option<PerceptualLinkage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_priority: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_manifest: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_root: Option<PathBuf>,
}

impl Settings {
    /// Default platform-specific config file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "mediadupe", "mediadupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Figment with defaults, the TOML file (if any) and the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingFile` if `config_file` is given but does
    /// not exist.
    pub fn figment(config_file: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::MissingFile(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.exists()) {
                    log::debug!("Loading config from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Merge every layer, with `overrides` on top.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a layer is unreadable or has the wrong shape.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::figment(config_file)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| ConfigError::Figment(Box::new(e)))
    }

    /// Validate into an engine configuration.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<EngineConfig, ConfigError> {
        let tolerance = self.duration_tolerance_seconds;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }

        if self.mode.uses_perceptual() && self.perceptual_frame_count == 0 {
            return Err(ConfigError::InvalidFrameCount);
        }

        let keep_priority = self
            .keep_priority
            .iter()
            .map(|name| name.parse::<KeepCriterion>())
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(ref pattern) = self.pattern {
            let invalid = |e: ignore::Error| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            };
            let mut builder = ignore::overrides::OverrideBuilder::new("/");
            builder.add(pattern).map_err(invalid)?;
            builder.build().map_err(invalid)?;
        }

        let finder = FinderConfig::default()
            .with_mode(self.mode)
            .with_tolerance(ToleranceConfig {
                duration_tolerance_seconds: tolerance,
                require_same_resolution: self.require_same_resolution,
                require_same_codec: self.require_same_codec,
                require_same_container: self.require_same_container,
            })
            .with_perceptual(PerceptualConfig {
                threshold_per_frame: self.perceptual_threshold_per_frame,
                sample_frame_count: self.perceptual_frame_count,
                linkage: self.perceptual_linkage,
            })
            .with_keep_priority(keep_priority)
            .with_threads(self.threads);

        let walker = WalkEnumerator::new()
            .with_max_depth(self.max_depth)
            .with_pattern(self.pattern.clone())
            .with_follow_symlinks(self.follow_symlinks);

        let dispose = DisposeConfig::default()
            .with_dry_run(self.dry_run)
            .with_force(self.force)
            .with_quarantine_root(self.quarantine_root.clone());

        Ok(EngineConfig {
            finder,
            walker,
            media_manifest: self.media_manifest.clone(),
            dispose,
        })
    }
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine parameters
    pub finder: FinderConfig,
    /// Enumeration parameters
    pub walker: WalkEnumerator,
    /// Optional media manifest
    pub media_manifest: Option<PathBuf>,
    /// Disposal parameters (scan root is filled in per run)
    pub dispose: DisposeConfig,
}
