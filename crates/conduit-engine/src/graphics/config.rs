use std::time::Duration;

use crate::device::{DeviceInit, WaitPolicy};
use crate::scene::DEFAULT_CLEAR;
use crate::texture::PixelFormat;

/// Configuration for the wgpu-backed frame producer.
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    /// Device acquisition parameters.
    pub device: DeviceInit,

    /// Render-target format. Readback converts from it to RGBA8.
    pub format: PixelFormat,

    /// Colour the scene clears to before drawing.
    pub clear_color: wgpu::Color,

    /// Wait policy for frame readback.
    ///
    /// Normal operation waits for the map to finish; a bounded policy turns a
    /// stuck map into a failed frame instead of a hung worker.
    pub read_wait: WaitPolicy,

    /// Event-processing rounds run at shutdown before GPU objects are released.
    pub drain_iterations: u32,

    /// Sleep between drain rounds.
    pub drain_interval: Duration,
}

impl GraphicsConfig {
    /// Total time the shutdown drain may take.
    pub fn drain_budget(&self) -> Duration {
        self.drain_interval * self.drain_iterations
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            device: DeviceInit::default(),
            format: PixelFormat::Rgba8Unorm,
            clear_color: DEFAULT_CLEAR,
            read_wait: WaitPolicy::Unbounded,
            // 100 x 1 ms.
            drain_iterations: 100,
            drain_interval: Duration::from_millis(1),
        }
    }
}
