use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use tracing::debug;

use crate::color::convert::{gray_from_buffer, luminance, rgb_from_interleaved};
use crate::consts::JPEG_QUALITY;
use crate::error::{ProkudinError, Result};
use crate::frame::{ChannelImage, GrayRaster, RgbRaster};

/// Source of decoded channel exposures.
///
/// Camera RAW decoding (demosaicing, white balance) lives behind this seam;
/// the core only ever sees the 8-bit rasters it produces.
pub trait RasterDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<ChannelImage>;
}

/// Decoder for the raster formats the `image` crate understands (PNG, JPEG, TIFF, BMP, ...).
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileDecoder;

impl RasterDecoder for ImageFileDecoder {
    fn decode(&self, path: &Path) -> Result<ChannelImage> {
        let img = image::open(path).map_err(|e| ProkudinError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Decoded channel image"
        );
        channel_image_from_dynamic(&img).ok_or_else(|| ProkudinError::Decode {
            path: path.to_path_buf(),
            reason: "image has zero width or height".into(),
        })
    }
}

/// Load one channel exposure with the built-in decoder.
pub fn load_channel_image(path: &Path) -> Result<ChannelImage> {
    ImageFileDecoder.decode(path)
}

/// Convert a decoded image to a channel image.
///
/// Color sources keep their RGB raster and get a BT.601 grayscale for
/// registration; 16-bit sources are reduced to 8 bits.
pub fn channel_image_from_dynamic(img: &DynamicImage) -> Option<ChannelImage> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return None;
    }
    if img.color().has_color() {
        let rgb = rgb_from_interleaved(w, h, img.to_rgb8().into_raw())?;
        let gray = luminance(&rgb);
        Some(ChannelImage::with_color(gray, rgb))
    } else {
        let gray = gray_from_buffer(w, h, img.to_luma8().into_raw())?;
        Some(ChannelImage::new(gray))
    }
}

/// Raster formats the export pipeline can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Tiff,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "tif" | "tiff" => Ok(Self::Tiff),
            other => Err(ProkudinError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ProkudinError::MissingExtension(path.to_path_buf()))?;
        Self::from_extension(ext)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "PNG"),
            Self::Jpeg => write!(f, "JPEG (quality {JPEG_QUALITY})"),
            Self::Tiff => write!(f, "TIFF"),
        }
    }
}

/// Save a grayscale raster as an 8-bit single-channel image.
pub fn save_gray(raster: &GrayRaster, path: &Path, format: OutputFormat) -> Result<()> {
    let (w, h) = raster.dims();
    let img = GrayImage::from_raw(w as u32, h as u32, raster.data.iter().copied().collect())
        .filter(|_| !raster.is_empty())
        .ok_or_else(|| no_data(path))?;
    write_image(&DynamicImage::ImageLuma8(img), path, format)
}

/// Save an RGB raster as an 8-bit three-channel image.
pub fn save_rgb(raster: &RgbRaster, path: &Path, format: OutputFormat) -> Result<()> {
    let (w, h) = raster.dims();
    let img = RgbImage::from_raw(w as u32, h as u32, raster.data.iter().copied().collect())
        .filter(|_| !raster.is_empty())
        .ok_or_else(|| no_data(path))?;
    write_image(&DynamicImage::ImageRgb8(img), path, format)
}

fn no_data(path: &Path) -> ProkudinError {
    ProkudinError::Save {
        path: path.to_path_buf(),
        reason: "No image data to save".into(),
    }
}

fn write_image(img: &DynamicImage, path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Png => {
            let file = BufWriter::new(File::create(path)?);
            let encoder =
                PngEncoder::new_with_quality(file, CompressionType::Best, FilterType::Adaptive);
            img.write_with_encoder(encoder)?;
        }
        OutputFormat::Jpeg => {
            let file = BufWriter::new(File::create(path)?);
            let encoder = JpegEncoder::new_with_quality(file, JPEG_QUALITY);
            img.write_with_encoder(encoder)?;
        }
        OutputFormat::Tiff => img.save_with_format(path, ImageFormat::Tiff)?,
    }
    Ok(())
}
