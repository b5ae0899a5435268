pub mod gaussian_blur;
pub mod levels;

pub use levels::{adjust_channel, brightness_contrast};
