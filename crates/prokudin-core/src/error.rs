use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProkudinError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Channel {channel}: no usable features detected")]
    InsufficientFeatures { channel: usize },

    #[error("Channel {channel}: insufficient matches ({got}/{required})")]
    InsufficientMatches {
        channel: usize,
        got: usize,
        required: usize,
    },

    #[error("Failed to estimate transformation for channel {channel}")]
    TransformEstimationFailed { channel: usize },

    #[error("Channel size mismatch: {expected_w}x{expected_h} vs {actual_w}x{actual_h}")]
    DimensionMismatch {
        expected_w: usize,
        expected_h: usize,
        actual_w: usize,
        actual_h: usize,
    },

    #[error("Channels differ in size and could not be aligned: {reason}")]
    UnalignedSizes { reason: String },

    #[error("Channel index {0} out of range (expected 0..3)")]
    InvalidChannel(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("No file extension provided: {}", .0.display())]
    MissingExtension(PathBuf),

    #[error("No images to save")]
    NothingToExport,

    #[error("Failed to save {}: {reason}", .path.display())]
    Save { path: PathBuf, reason: String },

    #[error("Alignment cancelled")]
    Cancelled,
}

impl ProkudinError {
    /// Index of the channel an alignment error refers to, if any.
    pub fn channel(&self) -> Option<usize> {
        match self {
            Self::InsufficientFeatures { channel }
            | Self::InsufficientMatches { channel, .. }
            | Self::TransformEstimationFailed { channel } => Some(*channel),
            Self::InvalidChannel(index) => Some(*index),
            _ => None,
        }
    }

    /// True for the failures the aligner raises on unusable source images.
    pub fn is_alignment_failure(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFeatures { .. }
                | Self::InsufficientMatches { .. }
                | Self::TransformEstimationFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProkudinError>;
