use ndarray::Axis;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::frame::GrayRaster;

/// Brightness and contrast adjustment of one aligned channel.
///
/// `out = clamp(v * (1 + contrast / 100) + brightness, 0, 255)`, truncated to
/// u8. `brightness` is additive in intensity levels, `contrast` a percentage.
/// An absent channel yields an absent result. Pure: the same input and
/// parameters always give bit-identical output.
pub fn adjust_channel(
    aligned: Option<&GrayRaster>,
    brightness: i32,
    contrast: i32,
) -> Option<GrayRaster> {
    aligned.map(|raster| brightness_contrast(raster, brightness, contrast))
}

/// Adjust a loaded channel. See [`adjust_channel`].
pub fn brightness_contrast(raster: &GrayRaster, brightness: i32, contrast: i32) -> GrayRaster {
    let gain = 1.0 + contrast as f32 / 100.0;
    let offset = brightness as f32;
    let map = |v: u8| -> u8 { (v as f32 * gain + offset).clamp(0.0, 255.0) as u8 };

    let (h, w) = raster.data.dim();
    let mut out = raster.data.clone();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut row| row.mapv_inplace(map));
    } else {
        out.mapv_inplace(map);
    }
    GrayRaster::new(out)
}
