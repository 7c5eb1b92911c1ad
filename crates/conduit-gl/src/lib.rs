//! Conduit GL crate.
//!
//! Shows frames from a `conduit-engine` producer inside a host's OpenGL
//! context. Frames cross either through a shared GPU surface, when the
//! platform has one and the probe succeeds, or through a CPU readback and
//! texture upload.

pub mod api;
pub mod bridge;
pub mod gl_fns;
pub mod quad;
pub mod sharing;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{GlApi, GlGeometry, GlProgram, GlTexture};
pub use bridge::InteropBridge;
pub use gl_fns::GlFunctions;
pub use sharing::{SharedSurface, SurfaceSharing, Unsupported};
pub use strategy::{CpuCopyStrategy, FrameStrategy, SharedSurfaceStrategy};
