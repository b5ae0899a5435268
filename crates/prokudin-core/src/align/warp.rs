use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::frame::{GrayRaster, RgbRaster};

use super::transform::SimilarityTransform;

/// Bilinear sample at fractional `(y, x)`. Pixels outside the raster read as 0.
pub fn bilinear_sample(data: &ArrayView2<u8>, y: f64, x: f64) -> f32 {
    let (h, w) = data.dim();

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let sample = |r: i64, c: i64| -> f32 {
        if r >= 0 && r < h as i64 && c >= 0 && c < w as i64 {
            data[[r as usize, c as usize]] as f32
        } else {
            0.0
        }
    };

    let v00 = sample(y0, x0);
    let v10 = sample(y0, x1);
    let v01 = sample(y1, x0);
    let v11 = sample(y1, x1);

    v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy
}

/// Resample `src` into an `out_w` x `out_h` grid.
///
/// `to_source` maps output pixel coordinates back into `src`; pixels that
/// land outside `src` are filled with 0.
pub fn warp_gray(
    src: &GrayRaster,
    to_source: &SimilarityTransform,
    out_w: usize,
    out_h: usize,
) -> GrayRaster {
    GrayRaster::new(warp_plane(src.data.view(), to_source, out_w, out_h))
}

/// Apply [`warp_gray`] to each plane of an RGB raster.
pub fn warp_rgb(
    src: &RgbRaster,
    to_source: &SimilarityTransform,
    out_w: usize,
    out_h: usize,
) -> RgbRaster {
    let mut out = Array3::<u8>::zeros((out_h, out_w, 3));
    for (plane, mut dst) in out.axis_iter_mut(Axis(2)).enumerate() {
        let warped = warp_plane(src.data.index_axis(Axis(2), plane), to_source, out_w, out_h);
        dst.assign(&warped);
    }
    RgbRaster::new(out)
}

fn warp_plane(
    src: ArrayView2<u8>,
    to_source: &SimilarityTransform,
    out_w: usize,
    out_h: usize,
) -> Array2<u8> {
    let mut out = Array2::<u8>::zeros((out_h, out_w));
    let fill_row = |row: usize, mut line: ndarray::ArrayViewMut1<u8>| {
        for (col, px) in line.iter_mut().enumerate() {
            let (sx, sy) = to_source.apply(col as f64, row as f64);
            *px = bilinear_sample(&src, sy, sx).round().clamp(0.0, 255.0) as u8;
        }
    };

    if out_h * out_w >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(out.axis_iter_mut(Axis(0))).par_for_each(|row, line| fill_row(row, line));
    } else {
        for (row, line) in out.axis_iter_mut(Axis(0)).enumerate() {
            fill_row(row, line);
        }
    }
    out
}
