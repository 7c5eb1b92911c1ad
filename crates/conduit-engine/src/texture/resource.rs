use std::sync::Arc;

use anyhow::{Context, Result};

use crate::device::{block_on_completion, Completion, DeviceContext, WaitPolicy};

use super::{MemLayout, PixelFormat};

/// Description of an offscreen render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self { width, height, format }
    }

    /// Usage shared by every render target: drawn into, copied out of, and
    /// sampled by interop consumers.
    pub const USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
        .union(wgpu::TextureUsages::COPY_SRC)
        .union(wgpu::TextureUsages::TEXTURE_BINDING);

    /// Readback layout for a texture of this description, `None` when a row
    /// is too wide to copy.
    pub fn layout(&self) -> Option<MemLayout> {
        MemLayout::new(self.width, self.height, self.format.bytes_per_pixel())
    }
}

/// Render-target texture and its default view.
pub struct TextureResource {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: TextureDesc,
}

impl TextureResource {
    /// Creates the texture and view.
    ///
    /// Fails on zero-sized or over-limit dimensions up front; anything else
    /// wgpu rejects comes back as an error rather than a panic.
    pub fn new(ctx: &DeviceContext, desc: TextureDesc) -> Result<Self> {
        anyhow::ensure!(
            desc.width > 0 && desc.height > 0,
            "texture has zero size ({}x{})",
            desc.width,
            desc.height
        );
        let max = ctx.limits().max_texture_dimension_2d;
        anyhow::ensure!(
            desc.width <= max && desc.height <= max,
            "texture {}x{} exceeds device limit {max}",
            desc.width,
            desc.height
        );

        desc.layout().context("texture rows are too wide to read back")?;

        let texture = ctx.validated("render target", |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("conduit render target"),
                size: wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: desc.format.to_wgpu(),
                usage: TextureDesc::USAGE,
                view_formats: &[],
            })
        })?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self { texture, view, desc })
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn desc(&self) -> TextureDesc {
        self.desc
    }

    /// Copies the texture into a mappable buffer and blocks until it is mapped.
    ///
    /// Returns `Ok(None)` without touching the GPU when `layout` is empty.
    /// The wait pumps the device's event processing; with
    /// [`WaitPolicy::Bounded`] an expired wait is an error.
    pub fn read(
        &self,
        ctx: &DeviceContext,
        layout: &MemLayout,
        policy: WaitPolicy,
    ) -> Result<Option<MappedReadback>> {
        if layout.is_empty() {
            return Ok(None);
        }

        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("conduit readback buffer"),
            size: layout.buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("conduit readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(layout.bytes_per_row),
                    rows_per_image: Some(layout.height),
                },
            },
            wgpu::Extent3d {
                width: layout.width,
                height: layout.height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue().submit(std::iter::once(encoder.finish()));

        let mapped = Arc::new(Completion::new());
        let signal = Arc::clone(&mapped);
        buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| signal.complete(result));

        let status = block_on_completion(&mapped, policy, || ctx.pump())
            .context("timed out waiting for readback buffer to map")?;
        status.context("readback buffer map failed")?;

        Ok(Some(MappedReadback {
            buffer,
            layout: *layout,
        }))
    }
}

/// A mapped readback buffer. Unmapped when dropped.
pub struct MappedReadback {
    buffer: wgpu::Buffer,
    layout: MemLayout,
}

impl MappedReadback {
    pub fn layout(&self) -> &MemLayout {
        &self.layout
    }

    /// Runs `f` over the mapped bytes (row-padded per [`MemLayout`]).
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let view = self.buffer.slice(..).get_mapped_range();
        f(&view)
    }
}

impl Drop for MappedReadback {
    fn drop(&mut self) {
        self.buffer.unmap();
    }
}
