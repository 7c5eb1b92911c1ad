//! CPU-side frames produced by readback.

mod convert;
mod image;

pub use convert::readback_to_image;
pub use image::CpuImage;
