//! Validation scene.
//!
//! A fixed coloured triangle drawn over a cleared background. It exists to
//! give the readback and interop paths known pixels to check against.

mod triangle;

pub use triangle::{DEFAULT_CLEAR, TRIANGLE_VERTICES, TriangleScene, TriangleVertex};
