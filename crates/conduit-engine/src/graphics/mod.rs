//! Offscreen frame production.
//!
//! [`Graphics`] is the thread-safe facade: any thread may initialize, resize,
//! render, read back or shut down. The GPU work itself sits behind
//! [`FrameBackend`]; [`WgpuBackend`] is the real one.

mod backend;
mod config;
mod facade;
mod source;

pub use backend::{FrameBackend, SharedTextureRef, WgpuBackend};
pub use config::GraphicsConfig;
pub use facade::Graphics;
pub use source::FrameSource;
