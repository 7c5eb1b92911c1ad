//! Conduit engine crate.
//!
//! Offscreen GPU frame production on wgpu: device setup, render targets,
//! blocking readback into CPU images, and a thread-safe facade that a
//! display-side consumer can drive from any thread.

pub mod device;
pub mod frame;
pub mod graphics;
pub mod logging;
pub mod scene;
pub mod texture;
pub mod time;

pub use graphics::{FrameBackend, FrameSource, Graphics, GraphicsConfig, SharedTextureRef};

// Consumers sharing the producer's device need the same wgpu version.
pub use wgpu;
