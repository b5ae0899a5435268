/// Number of channel slots in a session (reference + two aligned channels).
pub const CHANNEL_COUNT: usize = 3;

/// Index of the reference channel every other channel is warped into.
pub const REFERENCE_CHANNEL: usize = 0;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Maximum number of keypoints kept per channel (strongest Harris response first).
pub const DEFAULT_MAX_FEATURES: usize = 1000;

/// Minimum number of cross-checked matches required to trust a transform.
///
/// Earlier revisions of the tool used 10; 50 is the later, stricter value.
pub const DEFAULT_MIN_MATCHES: usize = 50;

/// FAST segment-test intensity threshold.
pub const DEFAULT_FAST_THRESHOLD: u8 = 20;

/// Number of scale pyramid levels searched for keypoints.
pub const DEFAULT_PYRAMID_LEVELS: usize = 4;

/// Downscale factor between consecutive pyramid levels.
pub const DEFAULT_PYRAMID_SCALE: f32 = 1.2;

/// RANSAC reprojection threshold in pixels.
pub const DEFAULT_RANSAC_THRESHOLD: f64 = 3.0;

/// RANSAC iteration cap.
pub const DEFAULT_RANSAC_ITERATIONS: usize = 2000;

/// RANSAC target confidence for adaptive early termination.
pub const DEFAULT_RANSAC_CONFIDENCE: f64 = 0.99;

/// Fixed RANSAC seed so alignment is reproducible.
pub const DEFAULT_RANSAC_SEED: u64 = 42;

/// Radius of the circular patch used for orientation and descriptors.
pub const PATCH_RADIUS: usize = 15;

/// Number of bits in a BRIEF descriptor.
pub const DESCRIPTOR_BITS: usize = 256;

/// Gaussian sigma applied before sampling descriptor pairs.
pub const DESCRIPTOR_BLUR_SIGMA: f32 = 2.0;

/// Harris detector free parameter.
pub const HARRIS_K: f32 = 0.04;

/// Smallest pyramid level side length worth searching.
pub const MIN_PYRAMID_SIDE: usize = 32;

/// Slider ranges shared by the session and the CLI.
pub const BRIGHTNESS_RANGE: (i32, i32) = (-100, 100);
pub const CONTRAST_RANGE: (i32, i32) = (-100, 100);
pub const INTENSITY_RANGE: (i32, i32) = (0, 200);

/// Default intensity (percent) applied at composite time.
pub const DEFAULT_INTENSITY: i32 = 100;

/// Fraction of each image side covered by a fresh crop rectangle.
pub const DEFAULT_CROP_FRACTION: f32 = 0.8;

/// Smallest crop side (pixels) accepted while editing the working rectangle.
pub const MIN_CROP_SIZE: i32 = 50;

/// JPEG quality used for every JPEG export.
pub const JPEG_QUALITY: u8 = 95;
