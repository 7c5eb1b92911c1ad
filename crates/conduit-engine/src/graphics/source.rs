use crate::frame::CpuImage;

use super::{FrameBackend, Graphics, SharedTextureRef};

/// What a display-side consumer needs from a frame producer.
///
/// Object-safe so consumers can hold `Arc<dyn FrameSource>` without naming the
/// backend type.
pub trait FrameSource: Send + Sync {
    fn is_initialized(&self) -> bool;

    /// Current render-target size.
    fn texture_size(&self) -> (u32, u32);

    /// Draws one frame without reading it back.
    fn render_frame(&self);

    /// Renders a frame and reads it into `image`. Returns whether it succeeded.
    fn render_frame_to_image_into(&self, image: &mut CpuImage) -> bool;

    /// Runs `f` with the live render target. Returns `false` if there was none.
    fn with_shared_texture(&self, f: &mut dyn FnMut(SharedTextureRef<'_>)) -> bool;

    fn render_frame_to_image(&self) -> Option<CpuImage> {
        let mut image = CpuImage::default();
        self.render_frame_to_image_into(&mut image).then_some(image)
    }
}

impl<B: FrameBackend> FrameSource for Graphics<B> {
    fn is_initialized(&self) -> bool {
        Graphics::is_initialized(self)
    }

    fn texture_size(&self) -> (u32, u32) {
        Graphics::texture_size(self)
    }

    fn render_frame(&self) {
        Graphics::render_frame(self);
    }

    fn render_frame_to_image_into(&self, image: &mut CpuImage) -> bool {
        Graphics::render_frame_to_image_into(self, image)
    }

    fn with_shared_texture(&self, f: &mut dyn FnMut(SharedTextureRef<'_>)) -> bool {
        Graphics::with_shared_texture(self, f).is_some()
    }
}
