//! Per-frame texture sources for the bridge.

mod cpu;
mod shared;

pub use cpu::CpuCopyStrategy;
pub use shared::SharedSurfaceStrategy;

use anyhow::Result;
use conduit_engine::FrameSource;

use crate::api::{GlApi, GlTexture};

/// One way of getting the producer's frame into a GL texture.
pub trait FrameStrategy<G: GlApi> {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy can work at all with `source`. Called once per
    /// bridge initialisation.
    fn probe(&mut self, source: &dyn FrameSource) -> bool;

    /// Renders a frame and returns the texture holding it.
    fn update(&mut self, gl: &mut G, source: &dyn FrameSource) -> Result<GlTexture>;

    /// Frees everything the strategy created. It may be used again afterwards.
    fn release(&mut self, gl: &mut G);
}
