pub mod composite;
pub mod convert;

pub use composite::{composite, composite_partial, grayscale_preview};
pub use convert::luminance;
