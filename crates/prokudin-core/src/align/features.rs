//! Oriented FAST keypoints with steered BRIEF descriptors.
//!
//! Each pyramid level is searched with a FAST-9 segment test, thinned by 3x3
//! non-maximum suppression and ranked by Harris corner response. Orientation
//! comes from the intensity centroid of a circular patch; the descriptor is a
//! 256-bit intensity comparison pattern rotated by that orientation and
//! sampled from a Gaussian-smoothed copy of the level.

use std::sync::OnceLock;

use ndarray::Array2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::consts::{
    DESCRIPTOR_BITS, DESCRIPTOR_BLUR_SIGMA, HARRIS_K, MIN_PYRAMID_SIDE, PATCH_RADIUS,
};
use crate::filters::gaussian_blur::gaussian_blur_array;
use crate::frame::GrayRaster;
use crate::pipeline::config::AlignmentConfig;

pub const DESCRIPTOR_BYTES: usize = DESCRIPTOR_BITS / 8;

/// Packed binary descriptor.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// FAST circle radius; also the detection border.
const FAST_RADIUS: usize = 3;
/// Contiguous arc length for a FAST-9 corner.
const FAST_ARC: usize = 9;
const HARRIS_HALF_BLOCK: isize = 3;
const PATTERN_SEED: u64 = 0x0b5e_55ed;

/// Bresenham circle of radius 3, clockwise from 12 o'clock, as (dx, dy).
const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Position in full-resolution pixel coordinates.
    pub x: f32,
    pub y: f32,
    /// Harris corner response at the detection level.
    pub response: f32,
    /// Orientation in radians.
    pub angle: f32,
    /// Pyramid level the keypoint was found on.
    pub level: usize,
}

/// Keypoints and their descriptors, index-aligned, strongest first.
#[derive(Clone, Debug, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Keypoint positions as `(x, y)` pairs.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.keypoints
            .iter()
            .map(|k| (k.x as f64, k.y as f64))
            .collect()
    }
}

/// Detect keypoints and compute descriptors for one grayscale raster.
pub fn detect_and_describe(raster: &GrayRaster, config: &AlignmentConfig) -> Features {
    if raster.is_empty() {
        return Features::default();
    }
    let base = raster.data.mapv(f32::from);
    let levels = build_pyramid(&base, config.pyramid_levels, config.pyramid_scale);

    let mut found: Vec<(Keypoint, Descriptor)> = levels
        .par_iter()
        .enumerate()
        .flat_map_iter(|(level, (img, factor))| {
            detect_level(img, level, *factor, config.fast_threshold)
        })
        .collect();

    found.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
    found.truncate(config.max_features);

    let (keypoints, descriptors) = found.into_iter().unzip();
    Features {
        keypoints,
        descriptors,
    }
}

/// Level images with their scale factor relative to full resolution.
fn build_pyramid(base: &Array2<f32>, levels: usize, scale: f32) -> Vec<(Array2<f32>, f32)> {
    let (h, w) = base.dim();
    let mut out = vec![(base.clone(), 1.0f32)];
    for level in 1..levels {
        let factor = scale.powi(level as i32);
        let nw = (w as f32 / factor).round() as usize;
        let nh = (h as f32 / factor).round() as usize;
        if nw.min(nh) < MIN_PYRAMID_SIDE {
            break;
        }
        out.push((resize_bilinear(base, nw, nh), factor));
    }
    out
}

fn resize_bilinear(src: &Array2<f32>, new_w: usize, new_h: usize) -> Array2<f32> {
    let (h, w) = src.dim();
    let sx = w as f32 / new_w as f32;
    let sy = h as f32 / new_h as f32;
    Array2::from_shape_fn((new_h, new_w), |(r, c)| {
        let x = ((c as f32 + 0.5) * sx - 0.5).clamp(0.0, (w - 1) as f32);
        let y = ((r as f32 + 0.5) * sy - 0.5).clamp(0.0, (h - 1) as f32);
        let (x0, y0) = (x.floor() as usize, y.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
        let (fx, fy) = (x - x0 as f32, y - y0 as f32);
        src[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
            + src[[y0, x1]] * fx * (1.0 - fy)
            + src[[y1, x0]] * (1.0 - fx) * fy
            + src[[y1, x1]] * fx * fy
    })
}

fn detect_level(
    img: &Array2<f32>,
    level: usize,
    factor: f32,
    threshold: u8,
) -> Vec<(Keypoint, Descriptor)> {
    let scores = fast_scores(img, threshold as f32);
    let corners = non_max_suppression(&scores);
    if corners.is_empty() {
        return Vec::new();
    }

    let smoothed = gaussian_blur_array(img, DESCRIPTOR_BLUR_SIGMA);
    corners
        .into_iter()
        .map(|(x, y)| {
            let angle = intensity_centroid_angle(img, x, y);
            let kp = Keypoint {
                x: x as f32 * factor,
                y: y as f32 * factor,
                response: harris_response(img, x, y),
                angle,
                level,
            };
            (kp, steered_brief(&smoothed, x, y, angle))
        })
        .collect()
}

/// FAST-9 corner score map (0 where the segment test fails).
fn fast_scores(img: &Array2<f32>, threshold: f32) -> Array2<f32> {
    let (h, w) = img.dim();
    let mut scores = Array2::<f32>::zeros((h, w));
    if h <= 2 * FAST_RADIUS || w <= 2 * FAST_RADIUS {
        return scores;
    }

    for y in FAST_RADIUS..h - FAST_RADIUS {
        for x in FAST_RADIUS..w - FAST_RADIUS {
            let v = img[[y, x]];
            let ring: [f32; 16] = std::array::from_fn(|k| {
                let (dx, dy) = CIRCLE[k];
                img[[(y as isize + dy) as usize, (x as isize + dx) as usize]]
            });
            if let Some(score) = segment_test(v, &ring, threshold) {
                scores[[y, x]] = score;
            }
        }
    }
    scores
}

/// Returns the corner score when at least nine contiguous circle pixels are
/// all brighter than `v + t` or all darker than `v - t`.
fn segment_test(v: f32, ring: &[f32; 16], t: f32) -> Option<f32> {
    // Any 9-arc covers at least two of the four compass points.
    let compass = [ring[0], ring[4], ring[8], ring[12]];
    let bright = compass.iter().filter(|&&c| c > v + t).count();
    let dark = compass.iter().filter(|&&c| c < v - t).count();
    if bright < 2 && dark < 2 {
        return None;
    }

    let has_arc = |pred: &dyn Fn(f32) -> bool| {
        let mut run = 0;
        for k in 0..16 + FAST_ARC - 1 {
            if pred(ring[k % 16]) {
                run += 1;
                if run >= FAST_ARC {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    };

    let brighter = has_arc(&|c: f32| c > v + t);
    let darker = !brighter && has_arc(&|c: f32| c < v - t);
    if !brighter && !darker {
        return None;
    }

    let score = ring
        .iter()
        .map(|&c| {
            let d = if brighter { c - v } else { v - c };
            (d - t).max(0.0)
        })
        .sum::<f32>();
    Some(score)
}

/// Keep positive scores that are the strict maximum of their 3x3 neighbourhood.
fn non_max_suppression(scores: &Array2<f32>) -> Vec<(usize, usize)> {
    let (h, w) = scores.dim();
    let mut out = Vec::new();
    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let s = scores[[y, x]];
            if s <= 0.0 {
                continue;
            }
            let mut is_max = true;
            'window: for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    if (ny, nx) == (y, x) {
                        continue;
                    }
                    let n = scores[[ny, nx]];
                    // Ties go to the earlier pixel in raster order.
                    if n > s || (n == s && (ny, nx) < (y, x)) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                out.push((x, y));
            }
        }
    }
    out
}

#[inline]
fn at(img: &Array2<f32>, x: isize, y: isize) -> f32 {
    let (h, w) = img.dim();
    let cx = x.clamp(0, w as isize - 1) as usize;
    let cy = y.clamp(0, h as isize - 1) as usize;
    img[[cy, cx]]
}

/// Harris response `det(M) - k * trace(M)^2` over a 7x7 block.
fn harris_response(img: &Array2<f32>, x: usize, y: usize) -> f32 {
    let (x, y) = (x as isize, y as isize);
    let (mut sxx, mut syy, mut sxy) = (0.0f64, 0.0f64, 0.0f64);
    for dy in -HARRIS_HALF_BLOCK..=HARRIS_HALF_BLOCK {
        for dx in -HARRIS_HALF_BLOCK..=HARRIS_HALF_BLOCK {
            let (px, py) = (x + dx, y + dy);
            let ix = (at(img, px + 1, py) - at(img, px - 1, py)) as f64 * 0.5;
            let iy = (at(img, px, py + 1) - at(img, px, py - 1)) as f64 * 0.5;
            sxx += ix * ix;
            syy += iy * iy;
            sxy += ix * iy;
        }
    }
    let det = sxx * syy - sxy * sxy;
    let trace = sxx + syy;
    (det - HARRIS_K as f64 * trace * trace) as f32
}

/// Angle of the vector from the patch center to its intensity centroid.
fn intensity_centroid_angle(img: &Array2<f32>, x: usize, y: usize) -> f32 {
    let r = PATCH_RADIUS as isize;
    let (mut m01, mut m10) = (0.0f64, 0.0f64);
    for dy in -r..=r {
        let half = ((r * r - dy * dy) as f64).sqrt() as isize;
        for dx in -half..=half {
            let v = at(img, x as isize + dx, y as isize + dy) as f64;
            m10 += dx as f64 * v;
            m01 += dy as f64 * v;
        }
    }
    m01.atan2(m10) as f32
}

/// Sampling pairs `(x1, y1, x2, y2)` relative to the keypoint.
///
/// Isotropic Gaussian (sigma = patch size / 5) clamped to the patch, drawn
/// once from a fixed seed so descriptors are comparable across runs.
fn brief_pattern() -> &'static [[f32; 4]; DESCRIPTOR_BITS] {
    static PATTERN: OnceLock<[[f32; 4]; DESCRIPTOR_BITS]> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut rng = ChaCha8Rng::seed_from_u64(PATTERN_SEED);
        let sigma = (2 * PATCH_RADIUS + 1) as f64 / 5.0;
        let limit = PATCH_RADIUS as f64;
        let mut gauss = move || {
            // Box-Muller
            let u1: f64 = 1.0 - rng.random::<f64>();
            let u2: f64 = rng.random::<f64>();
            let g = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
            (g * sigma).clamp(-limit, limit) as f32
        };
        std::array::from_fn(|_| [gauss(), gauss(), gauss(), gauss()])
    })
}

fn steered_brief(smoothed: &Array2<f32>, x: usize, y: usize, angle: f32) -> Descriptor {
    let (sin, cos) = angle.sin_cos();
    let (cx, cy) = (x as f32, y as f32);
    let sample = |px: f32, py: f32| {
        let rx = cos * px - sin * py;
        let ry = sin * px + cos * py;
        at(
            smoothed,
            (cx + rx).round() as isize,
            (cy + ry).round() as isize,
        )
    };

    let mut desc = [0u8; DESCRIPTOR_BYTES];
    for (bit, &[x1, y1, x2, y2]) in brief_pattern().iter().enumerate() {
        if sample(x1, y1) < sample(x2, y2) {
            desc[bit / 8] |= 1 << (bit % 8);
        }
    }
    desc
}
