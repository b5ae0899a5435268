use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_FAST_THRESHOLD, DEFAULT_MAX_FEATURES, DEFAULT_MIN_MATCHES, DEFAULT_PYRAMID_LEVELS,
    DEFAULT_PYRAMID_SCALE, DEFAULT_RANSAC_CONFIDENCE, DEFAULT_RANSAC_ITERATIONS,
    DEFAULT_RANSAC_SEED, DEFAULT_RANSAC_THRESHOLD,
};
use crate::error::{ProkudinError, Result};

/// Top-level configuration, as read from a TOML file by the CLI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Keep at most this many keypoints per channel.
    pub max_features: usize,
    /// FAST segment-test threshold (intensity levels).
    pub fast_threshold: u8,
    /// Number of pyramid levels searched for keypoints (1 = full resolution only).
    pub pyramid_levels: usize,
    /// Downscale factor between pyramid levels.
    pub pyramid_scale: f32,
    /// Fewer cross-checked matches than this rejects the channel pair.
    pub min_matches: usize,
    pub ransac: RansacConfig,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            fast_threshold: DEFAULT_FAST_THRESHOLD,
            pyramid_levels: DEFAULT_PYRAMID_LEVELS,
            pyramid_scale: DEFAULT_PYRAMID_SCALE,
            min_matches: DEFAULT_MIN_MATCHES,
            ransac: RansacConfig::default(),
        }
    }
}

impl AlignmentConfig {
    /// Reject values the aligner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_features == 0 {
            return Err(ProkudinError::InvalidConfig(
                "max_features must be > 0".into(),
            ));
        }
        if self.pyramid_levels == 0 {
            return Err(ProkudinError::InvalidConfig(
                "pyramid_levels must be >= 1".into(),
            ));
        }
        if !(self.pyramid_scale > 1.0 && self.pyramid_scale.is_finite()) {
            return Err(ProkudinError::InvalidConfig(format!(
                "pyramid_scale must be > 1.0 (got {})",
                self.pyramid_scale
            )));
        }
        // Two correspondences are the minimum a similarity transform needs.
        if self.min_matches < 2 {
            return Err(ProkudinError::InvalidConfig(format!(
                "min_matches must be >= 2 (got {})",
                self.min_matches
            )));
        }
        self.ransac.validate()
    }
}

/// Robust estimator settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
    pub max_iterations: usize,
    /// Inlier distance threshold in pixels.
    pub inlier_threshold: f64,
    /// Target confidence for early termination.
    pub confidence: f64,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_RANSAC_ITERATIONS,
            inlier_threshold: DEFAULT_RANSAC_THRESHOLD,
            confidence: DEFAULT_RANSAC_CONFIDENCE,
            seed: DEFAULT_RANSAC_SEED,
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ProkudinError::InvalidConfig(
                "ransac.max_iterations must be > 0".into(),
            ));
        }
        if !(self.inlier_threshold > 0.0) {
            return Err(ProkudinError::InvalidConfig(
                "ransac.inlier_threshold must be > 0".into(),
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ProkudinError::InvalidConfig(
                "ransac.confidence must be in (0, 1)".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub source: ExportSource,
    pub naming: ChannelNaming,
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        self.naming.validate()
    }
}

/// Which channel buffers the export pipeline writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportSource {
    /// Post-alignment, pre-adjustment rasters.
    Aligned,
    /// What the preview shows: brightness/contrast applied, intensities in the combined image.
    #[default]
    Processed,
}

impl std::fmt::Display for ExportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aligned => write!(f, "Aligned"),
            Self::Processed => write!(f, "Processed"),
        }
    }
}

/// Filename suffixes for the per-channel export files.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelNaming {
    /// `r`, `g`, `b`
    #[default]
    Rgb,
    /// `ir`, `vis`, `uv`
    Spectral,
    Custom([String; 3]),
}

impl ChannelNaming {
    pub fn suffixes(&self) -> [&str; 3] {
        match self {
            Self::Rgb => ["r", "g", "b"],
            Self::Spectral => ["ir", "vis", "uv"],
            Self::Custom(names) => [&names[0], &names[1], &names[2]],
        }
    }

    /// Suffixes must be non-empty, distinct, and free of path separators.
    pub fn validate(&self) -> Result<()> {
        let suffixes = self.suffixes();
        for (i, suffix) in suffixes.iter().enumerate() {
            if suffix.trim().is_empty() {
                return Err(ProkudinError::InvalidConfig(format!(
                    "channel {i} suffix is empty"
                )));
            }
            if suffix.contains(['/', '\\']) {
                return Err(ProkudinError::InvalidConfig(format!(
                    "channel {i} suffix '{suffix}' contains a path separator"
                )));
            }
            if suffixes[..i].contains(suffix) {
                return Err(ProkudinError::InvalidConfig(format!(
                    "suffix '{suffix}' is used by more than one channel"
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ChannelNaming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c] = self.suffixes();
        write!(f, "{a}/{b}/{c}")
    }
}
