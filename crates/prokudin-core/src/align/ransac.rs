//! RANSAC estimation of a similarity transform from matched point pairs.
//!
//! Two-point minimal samples, inlier counting against a reprojection
//! threshold, adaptive early termination, and a least-squares refit on the
//! final inlier set. The RNG is seeded so results are reproducible.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::pipeline::config::RansacConfig;

use super::transform::{estimate_similarity, SimilarityTransform};

const MIN_SAMPLES: usize = 2;

/// Result of RANSAC estimation.
#[derive(Clone, Debug)]
pub struct RansacResult {
    pub transform: SimilarityTransform,
    /// Indices of inlier pairs under the refined transform.
    pub inliers: Vec<usize>,
    pub iterations: usize,
}

impl RansacResult {
    pub fn inlier_ratio(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.inliers.len() as f64 / total as f64
        }
    }
}

/// Estimate the transform mapping `src[k]` onto `dst[k]`.
///
/// Returns `None` when there are fewer than two pairs, when no sample yields
/// a usable model, or when the refined model is degenerate.
pub fn estimate(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
    config: &RansacConfig,
) -> Option<RansacResult> {
    let n = src.len();
    if n < MIN_SAMPLES || dst.len() != n {
        return None;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let threshold_sq = config.inlier_threshold * config.inlier_threshold;

    let mut best: Option<SimilarityTransform> = None;
    let mut best_inliers: Vec<usize> = Vec::new();
    let mut sample = [(0.0, 0.0); MIN_SAMPLES];
    let mut sample_dst = [(0.0, 0.0); MIN_SAMPLES];

    let mut max_iter = config.max_iterations.max(1);
    let mut iterations = 0;

    while iterations < max_iter {
        iterations += 1;

        let i = rng.random_range(0..n);
        let mut j = rng.random_range(0..n - 1);
        if j >= i {
            j += 1;
        }
        sample[0] = src[i];
        sample[1] = src[j];
        sample_dst[0] = dst[i];
        sample_dst[1] = dst[j];

        let Some(model) = estimate_similarity(&sample, &sample_dst) else {
            continue;
        };

        let inliers = count_inliers(src, dst, &model, threshold_sq);
        if inliers.len() > best_inliers.len() {
            best_inliers = inliers;
            best = Some(model);

            let ratio = best_inliers.len() as f64 / n as f64;
            max_iter = max_iter.min(adaptive_iterations(ratio, config.confidence));
        }
    }

    let model = best?;
    if best_inliers.len() < MIN_SAMPLES {
        return None;
    }

    let inlier_src: Vec<(f64, f64)> = best_inliers.iter().map(|&k| src[k]).collect();
    let inlier_dst: Vec<(f64, f64)> = best_inliers.iter().map(|&k| dst[k]).collect();
    let refined = estimate_similarity(&inlier_src, &inlier_dst).unwrap_or(model);
    let inliers = count_inliers(src, dst, &refined, threshold_sq);

    if refined.is_degenerate() || inliers.len() < MIN_SAMPLES {
        debug!(pairs = n, inliers = inliers.len(), "RANSAC model rejected");
        return None;
    }

    let result = RansacResult {
        transform: refined,
        inliers,
        iterations,
    };
    debug!(
        pairs = n,
        inliers = result.inliers.len(),
        inlier_ratio = result.inlier_ratio(n),
        iterations,
        "RANSAC converged"
    );
    Some(result)
}

fn count_inliers(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
    model: &SimilarityTransform,
    threshold_sq: f64,
) -> Vec<usize> {
    src.iter()
        .zip(dst)
        .enumerate()
        .filter_map(|(k, (&(sx, sy), &(dx, dy)))| {
            let (px, py) = model.apply(sx, sy);
            let err = (px - dx).powi(2) + (py - dy).powi(2);
            (err <= threshold_sq).then_some(k)
        })
        .collect()
}

/// Iterations needed to draw one all-inlier sample with `confidence`.
///
/// `N = log(1 - confidence) / log(1 - w^2)` for inlier ratio `w`.
pub(crate) fn adaptive_iterations(inlier_ratio: f64, confidence: f64) -> usize {
    if inlier_ratio <= 0.0 {
        return usize::MAX;
    }
    if inlier_ratio >= 1.0 {
        return 1;
    }
    let w_n = inlier_ratio.powi(MIN_SAMPLES as i32);
    let log_outlier = (1.0 - w_n).ln();
    if log_outlier >= 0.0 {
        return usize::MAX;
    }
    let n = ((1.0 - confidence).ln() / log_outlier).ceil();
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        1
    }
}
