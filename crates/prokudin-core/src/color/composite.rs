use ndarray::{Array2, Array3, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{ProkudinError, Result};
use crate::frame::{GrayRaster, RgbRaster};

/// Combine three processed channels into one RGB raster.
///
/// Plane `i` of the output is `clamp(processed[i] * intensities[i] / 100, 0, 255)`.
/// Returns `Ok(None)` while any channel is still absent. Channels of differing
/// sizes are an internal invariant violation (alignment forces a common size)
/// and fail with [`ProkudinError::DimensionMismatch`].
pub fn composite(
    processed: [Option<&GrayRaster>; 3],
    intensities: [i32; 3],
) -> Result<Option<RgbRaster>> {
    let [Some(r), Some(g), Some(b)] = processed else {
        return Ok(None);
    };
    check_same_dims(&[r, g, b])?;
    Ok(Some(merge_scaled(
        [&r.data, &g.data, &b.data],
        intensity_gains(intensities),
    )))
}

/// Combine whatever channels are present, filling absent ones with a black plane.
///
/// Used by export, where a partially loaded session can still be written.
/// Returns `Ok(None)` only when no channel is present.
pub fn composite_partial(
    channels: [Option<&GrayRaster>; 3],
    intensities: [i32; 3],
) -> Result<Option<RgbRaster>> {
    let present: Vec<&GrayRaster> = channels.iter().flatten().copied().collect();
    let Some(first) = present.first() else {
        return Ok(None);
    };
    check_same_dims(&present)?;

    let black = Array2::<u8>::zeros(first.data.dim());
    let plane = |i: usize| channels[i].map_or(&black, |c| &c.data);
    Ok(Some(merge_scaled(
        [plane(0), plane(1), plane(2)],
        intensity_gains(intensities),
    )))
}

/// Neutral preview of a single channel: the raster replicated into all three planes.
pub fn grayscale_preview(channel: &GrayRaster) -> RgbRaster {
    let d = &channel.data;
    merge_scaled([d, d, d], [1.0; 3])
}

fn intensity_gains(intensities: [i32; 3]) -> [f32; 3] {
    intensities.map(|i| i as f32 / 100.0)
}

fn check_same_dims(channels: &[&GrayRaster]) -> Result<()> {
    let (expected_w, expected_h) = channels[0].dims();
    for channel in &channels[1..] {
        let (actual_w, actual_h) = channel.dims();
        if (actual_w, actual_h) != (expected_w, expected_h) {
            return Err(ProkudinError::DimensionMismatch {
                expected_w,
                expected_h,
                actual_w,
                actual_h,
            });
        }
    }
    Ok(())
}

fn merge_scaled(planes: [&Array2<u8>; 3], gains: [f32; 3]) -> RgbRaster {
    let (h, w) = planes[0].dim();
    let mut out = Array3::<u8>::zeros((h, w, 3));

    let scale = |v: u8, gain: f32| -> u8 {
        if gain == 1.0 {
            v
        } else {
            (v as f32 * gain).clamp(0.0, 255.0) as u8
        }
    };

    let fill_row = |row: usize, mut out_row: ndarray::ArrayViewMut2<u8>| {
        for col in 0..w {
            for (i, plane) in planes.iter().enumerate() {
                out_row[[col, i]] = scale(plane[[row, col]], gains[i]);
            }
        }
    };

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, out_row)| fill_row(row, out_row));
    } else {
        for (row, out_row) in out.axis_iter_mut(Axis(0)).enumerate() {
            fill_row(row, out_row);
        }
    }

    RgbRaster::new(out)
}
