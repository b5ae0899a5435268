#![allow(dead_code)]

use ndarray::{Array2, Array3};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use prokudin_core::frame::{ChannelImage, GrayRaster, RgbRaster};

/// Random blocks of `block` x `block` pixels with values in 0..=255.
///
/// Sharp block junctions give the corner detector plenty to work with and
/// every region is distinct, so descriptors match unambiguously.
pub fn textured(width: usize, height: usize, block: usize, seed: u64) -> GrayRaster {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let bw = width.div_ceil(block);
    let bh = height.div_ceil(block);
    let cells: Vec<u8> = (0..bw * bh).map(|_| rng.random::<u8>()).collect();
    GrayRaster::new(Array2::from_shape_fn((height, width), |(r, c)| {
        cells[(r / block) * bw + c / block]
    }))
}

/// Move the content by `(dx, dy)` pixels, filling uncovered pixels with 0.
pub fn shifted(src: &GrayRaster, dx: isize, dy: isize) -> GrayRaster {
    let (h, w) = src.data.dim();
    GrayRaster::new(Array2::from_shape_fn((h, w), |(r, c)| {
        let sr = r as isize - dy;
        let sc = c as isize - dx;
        if sr >= 0 && sc >= 0 && (sr as usize) < h && (sc as usize) < w {
            src.data[[sr as usize, sc as usize]]
        } else {
            0
        }
    }))
}

pub fn constant(width: usize, height: usize, value: u8) -> GrayRaster {
    GrayRaster::new(Array2::from_elem((height, width), value))
}

/// Gray raster whose pixel `(r, c)` is `(r * w + c) % 256`.
pub fn ramp(width: usize, height: usize) -> GrayRaster {
    GrayRaster::new(Array2::from_shape_fn((height, width), |(r, c)| {
        ((r * width + c) % 256) as u8
    }))
}

/// RGB raster with the gray raster in every plane.
pub fn rgb_from_gray(gray: &GrayRaster) -> RgbRaster {
    let (h, w) = gray.data.dim();
    RgbRaster::new(Array3::from_shape_fn((h, w, 3), |(r, c, _)| gray.data[[r, c]]))
}

pub fn gray_channel(raster: GrayRaster) -> ChannelImage {
    ChannelImage::new(raster)
}

/// Mean absolute difference over `rows` x `cols`.
pub fn mean_abs_diff(
    a: &GrayRaster,
    b: &GrayRaster,
    rows: std::ops::Range<usize>,
    cols: std::ops::Range<usize>,
) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for r in rows {
        for c in cols.clone() {
            sum += (a.data[[r, c]] as f64 - b.data[[r, c]] as f64).abs();
            n += 1;
        }
    }
    sum / n.max(1) as f64
}
