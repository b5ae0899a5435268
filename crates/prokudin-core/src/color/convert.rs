use ndarray::{Array2, Array3};

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::frame::{GrayRaster, RgbRaster};

/// Luminance (ITU-R BT.601) of an RGB raster, rounded to the nearest level.
pub fn luminance(color: &RgbRaster) -> GrayRaster {
    let (h, w, _) = color.data.dim();
    let data = Array2::from_shape_fn((h, w), |(row, col)| {
        let r = color.data[[row, col, 0]] as f32;
        let g = color.data[[row, col, 1]] as f32;
        let b = color.data[[row, col, 2]] as f32;
        (LUMINANCE_R * r + LUMINANCE_G * g + LUMINANCE_B * b)
            .round()
            .clamp(0.0, 255.0) as u8
    });
    GrayRaster::new(data)
}

/// Build an interleaved RGB raster from a packed `[R, G, B, R, G, B, ...]` buffer.
///
/// Returns `None` when the buffer length does not match `width * height * 3`.
pub fn rgb_from_interleaved(width: usize, height: usize, pixels: Vec<u8>) -> Option<RgbRaster> {
    Array3::from_shape_vec((height, width, 3), pixels)
        .ok()
        .map(RgbRaster::new)
}

/// Build a grayscale raster from a row-major buffer.
pub fn gray_from_buffer(width: usize, height: usize, pixels: Vec<u8>) -> Option<GrayRaster> {
    Array2::from_shape_vec((height, width), pixels)
        .ok()
        .map(GrayRaster::new)
}
