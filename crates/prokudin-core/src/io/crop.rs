use std::fmt;
use std::str::FromStr;

use ndarray::s;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CROP_FRACTION, MIN_CROP_SIZE};
use crate::error::{ProkudinError, Result};
use crate::frame::{GrayRaster, RgbRaster};

/// A rectangle in reference-channel pixel coordinates.
///
/// Coordinates are signed: a rectangle handed in by a caller may extend past
/// the image on any side. It is intersected with the raster bounds before use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// The in-bounds part of a [`CropRect`], ready for slicing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CropRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` image.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Centered rectangle covering `fraction` of each image side.
    pub fn centered(width: usize, height: usize, fraction: f32) -> Self {
        let w = (width as f32 * fraction) as i32;
        let h = (height as f32 * fraction) as i32;
        Self::new((width as i32 - w) / 2, (height as i32 - h) / 2, w, h)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersect with `[0, img_w) x [0, img_h)`.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image or
    /// it has no area (zero or negative width/height).
    pub fn intersect(&self, img_w: usize, img_h: usize) -> Option<PixelRegion> {
        let x0 = (self.x as i64).max(0);
        let y0 = (self.y as i64).max(0);
        let x1 = (self.x as i64 + self.width as i64).min(img_w as i64);
        let y1 = (self.y as i64 + self.height as i64).min(img_h as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRegion {
            x: x0 as usize,
            y: y0 as usize,
            width: (x1 - x0) as usize,
            height: (y1 - y0) as usize,
        })
    }

    /// Largest rectangle with the given aspect ratio that fits inside this
    /// one, centered on the same point and kept inside the image.
    ///
    /// `Free` only clamps to the image. A rectangle entirely outside the image
    /// is replaced by the full image before fitting.
    pub fn fit_aspect(&self, aspect: CropAspect, img_w: usize, img_h: usize) -> CropRect {
        let bounds = self
            .intersect(img_w, img_h)
            .map(CropRect::from)
            .unwrap_or_else(|| CropRect::full(img_w, img_h));
        let Some(ratio) = aspect.ratio() else {
            return bounds;
        };

        let (bw, bh) = (bounds.width as f64, bounds.height as f64);
        let (w, h) = if bw / bh > ratio {
            ((bh * ratio).round(), bh)
        } else {
            (bw, (bw / ratio).round())
        };
        let (w, h) = (w.max(1.0), h.max(1.0));

        let (cx, cy) = bounds.center();
        let x = (cx - w / 2.0)
            .round()
            .min((bounds.x + bounds.width) as f64 - w)
            .max(bounds.x as f64);
        let y = (cy - h / 2.0)
            .round()
            .min((bounds.y + bounds.height) as f64 - h)
            .max(bounds.y as f64);

        CropRect::new(x as i32, y as i32, w as i32, h as i32)
    }
}

impl From<PixelRegion> for CropRect {
    fn from(r: PixelRegion) -> Self {
        CropRect::new(r.x as i32, r.y as i32, r.width as i32, r.height as i32)
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for CropRect {
    type Err = ProkudinError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| ProkudinError::InvalidConfig(format!("crop '{s}': {e}")))?;
        match parts[..] {
            [x, y, w, h] => Ok(CropRect::new(x, y, w, h)),
            _ => Err(ProkudinError::InvalidConfig(format!(
                "crop '{s}': expected x,y,width,height"
            ))),
        }
    }
}

/// Crop a grayscale raster. A degenerate intersection yields an empty raster.
///
/// The source is never modified; the result is an owned copy.
pub fn apply_crop(raster: &GrayRaster, rect: &CropRect) -> GrayRaster {
    match rect.intersect(raster.width(), raster.height()) {
        Some(r) => GrayRaster::new(
            raster
                .data
                .slice(s![r.y..r.y + r.height, r.x..r.x + r.width])
                .to_owned(),
        ),
        None => GrayRaster::empty(),
    }
}

/// Crop an RGB raster. A degenerate intersection yields an empty raster.
pub fn apply_crop_rgb(raster: &RgbRaster, rect: &CropRect) -> RgbRaster {
    match rect.intersect(raster.width(), raster.height()) {
        Some(r) => RgbRaster::new(
            raster
                .data
                .slice(s![r.y..r.y + r.height, r.x..r.x + r.width, ..])
                .to_owned(),
        ),
        None => RgbRaster::empty(),
    }
}

/// Crop when a rectangle is given, otherwise copy the raster unchanged.
pub fn crop_if_set(raster: &GrayRaster, rect: Option<&CropRect>) -> GrayRaster {
    match rect {
        Some(rect) => apply_crop(raster, rect),
        None => raster.clone(),
    }
}

/// Crop aspect ratio constraint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropAspect {
    #[default]
    Free,
    Fixed { width: u32, height: u32 },
}

impl CropAspect {
    pub const ALL: &[Self] = &[
        Self::Free,
        Self::Fixed { width: 1, height: 1 },
        Self::Fixed { width: 3, height: 2 },
        Self::Fixed { width: 2, height: 3 },
        Self::Fixed { width: 4, height: 3 },
        Self::Fixed { width: 3, height: 4 },
        Self::Fixed { width: 16, height: 9 },
        Self::Fixed { width: 9, height: 16 },
    ];

    /// Width/height ratio, or `None` for free (and for a zero component).
    pub fn ratio(&self) -> Option<f64> {
        match *self {
            Self::Fixed { width, height } if width > 0 && height > 0 => {
                Some(width as f64 / height as f64)
            }
            _ => None,
        }
    }
}

impl fmt::Display for CropAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "Free"),
            Self::Fixed { width, height } => write!(f, "{width}:{height}"),
        }
    }
}

/// Parses `free` or `W:H`.
impl FromStr for CropAspect {
    type Err = ProkudinError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("free") {
            return Ok(Self::Free);
        }
        let invalid =
            || ProkudinError::InvalidConfig(format!("aspect '{s}': expected W:H or free"));
        let (w, h) = s.split_once(':').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self::Fixed { width, height })
    }
}

/// Interactive crop state: an uncommitted working rectangle and the
/// committed (saved) one that rendering and export use.
#[derive(Clone, Debug, Default)]
pub struct CropState {
    active: bool,
    working: Option<CropRect>,
    saved: Option<CropRect>,
    aspect: CropAspect,
}

impl CropState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn working(&self) -> Option<&CropRect> {
        self.working.as_ref()
    }

    pub fn saved(&self) -> Option<&CropRect> {
        self.saved.as_ref()
    }

    pub fn aspect(&self) -> CropAspect {
        self.aspect
    }

    /// The rectangle rendering and export apply: the saved one, and only
    /// while crop mode is off.
    pub fn effective(&self) -> Option<&CropRect> {
        if self.active {
            None
        } else {
            self.saved.as_ref()
        }
    }

    /// Enter crop mode. The working rectangle starts from the saved one, or
    /// from a centered rectangle covering 80% of each side.
    pub fn begin(&mut self, img_w: usize, img_h: usize) {
        self.active = true;
        let start = self
            .saved
            .unwrap_or_else(|| CropRect::centered(img_w, img_h, DEFAULT_CROP_FRACTION));
        self.working = Some(start.fit_aspect(self.aspect, img_w, img_h));
    }

    /// Replace the working rectangle.
    ///
    /// The rectangle is clamped to the image and snapped to the active
    /// aspect ratio. Returns `false` (keeping the previous rectangle) when
    /// not in crop mode or when the result is smaller than the minimum size.
    pub fn set_working(&mut self, rect: CropRect, img_w: usize, img_h: usize) -> bool {
        if !self.active {
            return false;
        }
        let Some(region) = rect.intersect(img_w, img_h) else {
            return false;
        };
        let fitted = CropRect::from(region).fit_aspect(self.aspect, img_w, img_h);
        let min_w = MIN_CROP_SIZE.min(img_w as i32);
        let min_h = MIN_CROP_SIZE.min(img_h as i32);
        if fitted.width < min_w || fitted.height < min_h {
            return false;
        }
        self.working = Some(fitted);
        true
    }

    /// Change the aspect constraint and re-snap the working rectangle.
    pub fn set_aspect(&mut self, aspect: CropAspect, img_w: usize, img_h: usize) {
        self.aspect = aspect;
        if let Some(rect) = self.working {
            self.working = Some(rect.fit_aspect(aspect, img_w, img_h));
        }
    }

    /// Commit the working rectangle and leave crop mode.
    pub fn confirm(&mut self) -> Option<CropRect> {
        if let Some(rect) = self.working.take() {
            self.saved = Some(rect);
        }
        self.active = false;
        self.saved
    }

    /// Discard the working rectangle and leave crop mode.
    pub fn cancel(&mut self) {
        self.working = None;
        self.active = false;
    }

    /// Set the committed rectangle directly (batch use, no interaction).
    pub fn set_saved(&mut self, rect: Option<CropRect>) {
        self.saved = rect;
    }

    /// Remove the committed rectangle.
    pub fn clear(&mut self) {
        self.saved = None;
    }
}
