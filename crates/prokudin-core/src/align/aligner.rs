use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::consts::{CHANNEL_COUNT, REFERENCE_CHANNEL};
use crate::error::{ProkudinError, Result};
use crate::frame::ChannelImage;
use crate::pipeline::config::AlignmentConfig;
use crate::pipeline::{CancelToken, NoOpReporter, PipelineStage, ProgressReporter};

use super::features::{detect_and_describe, Features};
use super::matcher::match_cross_checked;
use super::ransac;
use super::transform::SimilarityTransform;
use super::warp::{warp_gray, warp_rgb};

/// Registration statistics for one non-reference channel.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelReport {
    pub channel: usize,
    pub reference_keypoints: usize,
    pub channel_keypoints: usize,
    pub matches: usize,
    pub inliers: usize,
    /// Maps channel pixel coordinates into the reference frame.
    pub transform: SimilarityTransform,
}

impl fmt::Display for ChannelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {}: {} matches, {} inliers, {}",
            self.channel, self.matches, self.inliers, self.transform
        )
    }
}

/// Aligned channels plus per-channel statistics.
#[derive(Clone, Debug)]
pub struct AlignmentOutcome {
    pub channels: [ChannelImage; CHANNEL_COUNT],
    /// One report per non-reference channel, in channel order.
    pub reports: Vec<ChannelReport>,
}

/// Align with default settings, no progress reporting and no cancellation.
pub fn align(channels: &[ChannelImage; CHANNEL_COUNT]) -> Result<[ChannelImage; CHANNEL_COUNT]> {
    align_channels(
        channels,
        &AlignmentConfig::default(),
        &NoOpReporter,
        &CancelToken::new(),
    )
    .map(|outcome| outcome.channels)
}

/// Warp channels 1 and 2 into the pixel grid of channel 0.
///
/// Either both channels align or the call fails; the error names the
/// offending channel. Checked for cancellation between stages.
pub fn align_channels(
    channels: &[ChannelImage; CHANNEL_COUNT],
    config: &AlignmentConfig,
    reporter: &dyn ProgressReporter,
    cancel: &CancelToken,
) -> Result<AlignmentOutcome> {
    config.validate()?;
    let reference = &channels[REFERENCE_CHANNEL];
    let (ref_w, ref_h) = (reference.width(), reference.height());

    // Detect
    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::DetectingFeatures, Some(CHANNEL_COUNT));
    let features: Vec<Features> = channels
        .par_iter()
        .map(|c| detect_and_describe(&c.gray, config))
        .collect();
    reporter.advance(CHANNEL_COUNT);
    reporter.finish_stage();

    for (i, f) in features.iter().enumerate() {
        debug!(channel = i, keypoints = f.len(), "Detected features");
    }
    for i in targets() {
        if features[REFERENCE_CHANNEL].is_empty() || features[i].is_empty() {
            return Err(ProkudinError::InsufficientFeatures { channel: i });
        }
    }

    // Match
    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::Matching, Some(CHANNEL_COUNT - 1));
    let ref_points = features[REFERENCE_CHANNEL].points();
    let mut correspondences = Vec::with_capacity(CHANNEL_COUNT - 1);
    for (done, i) in targets().enumerate() {
        let matches = match_cross_checked(
            &features[i].descriptors,
            &features[REFERENCE_CHANNEL].descriptors,
        );
        if matches.len() < config.min_matches {
            return Err(ProkudinError::InsufficientMatches {
                channel: i,
                got: matches.len(),
                required: config.min_matches,
            });
        }
        let points = features[i].points();
        let (src, dst): (Vec<_>, Vec<_>) = matches
            .iter()
            .map(|m| (points[m.query], ref_points[m.train]))
            .unzip();
        correspondences.push((i, src, dst));
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    // Estimate
    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::EstimatingTransform, Some(CHANNEL_COUNT - 1));
    let mut reports = Vec::with_capacity(CHANNEL_COUNT - 1);
    for (done, (i, src, dst)) in correspondences.iter().enumerate() {
        let result = ransac::estimate(src, dst, &config.ransac)
            .filter(|r| !r.transform.is_degenerate())
            .ok_or(ProkudinError::TransformEstimationFailed { channel: *i })?;
        let report = ChannelReport {
            channel: *i,
            reference_keypoints: features[REFERENCE_CHANNEL].len(),
            channel_keypoints: features[*i].len(),
            matches: src.len(),
            inliers: result.inliers.len(),
            transform: result.transform,
        };
        info!(
            channel = report.channel,
            matches = report.matches,
            inliers = report.inliers,
            scale = report.transform.scale(),
            rotation_deg = report.transform.rotation_degrees(),
            tx = report.transform.tx,
            ty = report.transform.ty,
            "Estimated channel transform"
        );
        reports.push(report);
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    // Warp
    check_cancelled(cancel)?;
    reporter.begin_stage(PipelineStage::Warping, Some(CHANNEL_COUNT - 1));
    let inverses = reports
        .iter()
        .map(|r| {
            r.transform
                .inverse()
                .map(|inv| (r.channel, inv))
                .ok_or(ProkudinError::TransformEstimationFailed { channel: r.channel })
        })
        .collect::<Result<Vec<_>>>()?;
    let warped: Vec<ChannelImage> = inverses
        .par_iter()
        .map(|(i, inv)| warp_channel(&channels[*i], inv, ref_w, ref_h))
        .collect();
    reporter.advance(CHANNEL_COUNT - 1);
    reporter.finish_stage();
    check_cancelled(cancel)?;

    let mut warped = warped.into_iter();
    let mut next = || warped.next().unwrap_or_else(|| reference.clone());
    let aligned = [reference.clone(), next(), next()];

    Ok(AlignmentOutcome {
        channels: aligned,
        reports,
    })
}

fn targets() -> impl Iterator<Item = usize> {
    (0..CHANNEL_COUNT).filter(|&i| i != REFERENCE_CHANNEL)
}

fn warp_channel(
    channel: &ChannelImage,
    to_source: &SimilarityTransform,
    out_w: usize,
    out_h: usize,
) -> ChannelImage {
    let gray = warp_gray(&channel.gray, to_source, out_w, out_h);
    match &channel.color {
        Some(rgb) => ChannelImage::with_color(gray, warp_rgb(rgb, to_source, out_w, out_h)),
        None => ChannelImage::new(gray),
    }
}

fn check_cancelled(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ProkudinError::Cancelled)
    } else {
        Ok(())
    }
}
