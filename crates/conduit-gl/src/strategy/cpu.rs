use anyhow::{Result, ensure};
use conduit_engine::FrameSource;
use conduit_engine::frame::CpuImage;

use crate::api::{GlApi, GlTexture};

use super::FrameStrategy;

/// Render, read back into CPU memory, upload. Works everywhere.
///
/// The CPU image and GL texture are reused across frames; the texture is
/// only reallocated when the frame size changes.
#[derive(Debug, Default)]
pub struct CpuCopyStrategy {
    image: CpuImage,
    texture: Option<GlTexture>,
    uploaded: (u32, u32),
}

impl CpuCopyStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last frame read back.
    pub fn image(&self) -> &CpuImage {
        &self.image
    }
}

impl<G: GlApi> FrameStrategy<G> for CpuCopyStrategy {
    fn name(&self) -> &'static str {
        "cpu-copy"
    }

    fn probe(&mut self, _source: &dyn FrameSource) -> bool {
        true
    }

    fn update(&mut self, gl: &mut G, source: &dyn FrameSource) -> Result<GlTexture> {
        ensure!(
            source.render_frame_to_image_into(&mut self.image),
            "frame readback failed"
        );

        let texture = *self.texture.get_or_insert_with(|| gl.create_texture());
        let size = (self.image.width(), self.image.height());
        gl.upload_rgba(texture, size.0, size.1, self.image.pixels(), size != self.uploaded);
        self.uploaded = size;

        Ok(texture)
    }

    fn release(&mut self, gl: &mut G) {
        if let Some(texture) = self.texture.take() {
            gl.delete_texture(texture);
        }
        self.uploaded = (0, 0);
    }
}
