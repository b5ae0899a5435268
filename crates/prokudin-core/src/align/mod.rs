mod aligner;
pub mod features;
pub mod matcher;
pub mod ransac;
pub mod transform;
pub mod warp;

pub use aligner::{align, align_channels, AlignmentOutcome, ChannelReport};
pub use transform::SimilarityTransform;
pub use warp::{warp_gray, warp_rgb};
