use ndarray::{Array2, Array3};

/// A single 8-bit grayscale raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayRaster {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<u8>,
}

impl GrayRaster {
    pub fn new(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// A zero-sized raster, the result of a degenerate crop.
    pub fn empty() -> Self {
        Self::new(Array2::zeros((0, 0)))
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }
}

/// An interleaved 8-bit RGB raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbRaster {
    /// Pixel data, shape = (height, width, 3), planes in R, G, B order
    pub data: Array3<u8>,
}

impl RgbRaster {
    pub fn new(data: Array3<u8>) -> Self {
        Self { data }
    }

    pub fn empty() -> Self {
        Self::new(Array3::zeros((0, 0, 3)))
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Copy out one color plane (0 = R, 1 = G, 2 = B).
    pub fn plane(&self, index: usize) -> GrayRaster {
        GrayRaster::new(self.data.index_axis(ndarray::Axis(2), index).to_owned())
    }
}

/// A decoded channel exposure: the grayscale raster used for registration
/// plus the color raster it came from, if the source was color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelImage {
    pub gray: GrayRaster,
    pub color: Option<RgbRaster>,
}

impl ChannelImage {
    pub fn new(gray: GrayRaster) -> Self {
        Self { gray, color: None }
    }

    pub fn with_color(gray: GrayRaster, color: RgbRaster) -> Self {
        Self {
            gray,
            color: Some(color),
        }
    }

    pub fn width(&self) -> usize {
        self.gray.width()
    }

    pub fn height(&self) -> usize {
        self.gray.height()
    }
}

impl From<GrayRaster> for ChannelImage {
    fn from(gray: GrayRaster) -> Self {
        Self::new(gray)
    }
}
