//! Platform shared-surface primitives.
//!
//! A shared surface is a texture both the producer's GPU device and the GL
//! context can address, so a frame crosses without touching CPU memory.
//! [`Unsupported`] stands in on platforms that have no such primitive.

#[cfg(all(feature = "egl", target_os = "linux"))]
mod egl;

#[cfg(all(feature = "egl", target_os = "linux"))]
pub use egl::{EglSharing, EglSurface};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail, ensure};
use conduit_engine::device::{Completion, WaitPolicy, block_on_completion};
use conduit_engine::wgpu;
use conduit_engine::{FrameSource, SharedTextureRef};

use crate::api::GlTexture;

/// A surface created by a [`SurfaceSharing`] implementation.
pub trait SharedSurface {
    /// GL texture aliasing the surface.
    fn gl_texture(&self) -> GlTexture;
    fn size(&self) -> (u32, u32);
}

/// Creates, fills and frees shared surfaces.
///
/// Every method runs on the GL thread with the consumer's context current.
pub trait SurfaceSharing {
    type Surface: SharedSurface;

    /// Whether the primitive is usable with this producer and GL context.
    fn probe(&mut self, source: &dyn FrameSource) -> bool;

    /// Creates a surface sized to `shared`.
    ///
    /// On error nothing created along the way is left behind.
    fn create_surface(&mut self, shared: &SharedTextureRef<'_>) -> Result<Self::Surface>;

    /// Copies the producer's current frame into `surface` and waits for the
    /// copy to land.
    fn blit(&mut self, shared: &SharedTextureRef<'_>, surface: &Self::Surface) -> Result<()>;

    fn release(&mut self, surface: Self::Surface);
}

/// Longest a blit may take before the frame falls back to the CPU path.
pub const BLIT_TIMEOUT: Duration = Duration::from_millis(250);

/// GPU-to-GPU copy of the producer's texture into `dst`, blocking until the
/// queue reports the work done.
///
/// `dst` must live on `shared.device`, match its size and format, and carry
/// `COPY_DST`.
pub fn copy_into(shared: &SharedTextureRef<'_>, dst: &wgpu::Texture) -> Result<()> {
    let extent = wgpu::Extent3d {
        width: shared.width,
        height: shared.height,
        depth_or_array_layers: 1,
    };
    ensure!(dst.size() == extent, "destination size differs from the producer texture");
    ensure!(
        dst.usage().contains(wgpu::TextureUsages::COPY_DST),
        "destination texture is not a copy target"
    );

    let mut encoder = shared
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("conduit shared blit"),
        });
    encoder.copy_texture_to_texture(
        shared.texture.as_image_copy(),
        dst.as_image_copy(),
        extent,
    );
    shared.queue.submit(std::iter::once(encoder.finish()));

    let done = Arc::new(Completion::new());
    let signal = Arc::clone(&done);
    shared
        .queue
        .on_submitted_work_done(move || signal.complete(()));

    let device = shared.device;
    let finished = block_on_completion(&done, WaitPolicy::Bounded(BLIT_TIMEOUT), || {
        if let Err(err) = device.poll(wgpu::PollType::Poll) {
            log::trace!("device poll: {err}");
        }
    });
    if finished.is_none() {
        bail!("shared blit did not finish within {BLIT_TIMEOUT:?}");
    }
    Ok(())
}

/// Surface type of [`Unsupported`]; never constructed.
#[derive(Debug)]
pub enum NoSurface {}

impl SharedSurface for NoSurface {
    fn gl_texture(&self) -> GlTexture {
        match *self {}
    }

    fn size(&self) -> (u32, u32) {
        match *self {}
    }
}

/// Sharing for platforms without a shared-surface primitive. Never probes
/// successfully, so the bridge stays on the CPU path.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl SurfaceSharing for Unsupported {
    type Surface = NoSurface;

    fn probe(&mut self, _source: &dyn FrameSource) -> bool {
        false
    }

    fn create_surface(&mut self, _shared: &SharedTextureRef<'_>) -> Result<NoSurface> {
        bail!("no shared-surface primitive on this platform")
    }

    fn blit(&mut self, _shared: &SharedTextureRef<'_>, surface: &NoSurface) -> Result<()> {
        match *surface {}
    }

    fn release(&mut self, surface: NoSurface) {
        match surface {}
    }
}
