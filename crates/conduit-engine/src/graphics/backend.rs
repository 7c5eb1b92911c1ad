use anyhow::{Context, Result};

use crate::device::DeviceContext;
use crate::scene::TriangleScene;
use crate::texture::{MemLayout, PixelFormat, TextureDesc, TextureResource};

use super::GraphicsConfig;

/// Non-owning view of the current render target.
///
/// Only valid inside [`Graphics::with_shared_texture`](super::Graphics::with_shared_texture);
/// a resize replaces the texture, so consumers must fetch a fresh reference
/// every frame.
pub struct SharedTextureRef<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub texture: &'a wgpu::Texture,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub backend: wgpu::Backend,
}

/// GPU work behind the [`Graphics`](super::Graphics) facade.
///
/// Every method is called with the facade's texture mutex held, so
/// implementations need no synchronization of their own.
pub trait FrameBackend: Send {
    /// Acquires instance, adapter, device and queue.
    fn init_device(&mut self) -> Result<()>;

    /// Compiles shaders and builds the scene pipeline.
    fn init_scene(&mut self) -> Result<()>;

    /// Creates (or replaces) the render target.
    ///
    /// On error the previous target, if any, stays in place.
    fn create_target(&mut self, width: u32, height: u32) -> Result<()>;

    /// Draws one frame into the render target.
    fn render(&mut self) -> Result<()>;

    /// Reads the render target back and hands the row-padded bytes to `sink`.
    ///
    /// Returns `Ok(false)` when there was nothing to read.
    fn read(&mut self, layout: &MemLayout, sink: &mut dyn FnMut(&[u8])) -> Result<bool>;

    /// Lets in-flight GPU work retire. Must return within a bounded time.
    fn drain(&mut self);

    /// Drops every GPU object, newest first.
    fn release(&mut self);

    /// Format of the render target.
    fn format(&self) -> PixelFormat;

    /// Current render target for zero-copy consumers.
    fn shared_texture(&self) -> Option<SharedTextureRef<'_>> {
        None
    }
}

/// [`FrameBackend`] running the triangle scene on wgpu.
pub struct WgpuBackend {
    config: GraphicsConfig,
    ctx: Option<DeviceContext>,
    scene: Option<TriangleScene>,
    target: Option<TextureResource>,
}

impl WgpuBackend {
    pub fn new(config: GraphicsConfig) -> Self {
        Self {
            config,
            ctx: None,
            scene: None,
            target: None,
        }
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    /// Device context, once initialized.
    pub fn context(&self) -> Option<&DeviceContext> {
        self.ctx.as_ref()
    }

    fn ctx(&self) -> Result<&DeviceContext> {
        self.ctx.as_ref().context("device not initialized")
    }
}

impl Default for WgpuBackend {
    fn default() -> Self {
        Self::new(GraphicsConfig::default())
    }
}

impl FrameBackend for WgpuBackend {
    fn init_device(&mut self) -> Result<()> {
        self.ctx = Some(DeviceContext::init(self.config.device.clone())?);
        Ok(())
    }

    fn init_scene(&mut self) -> Result<()> {
        let scene = TriangleScene::new(self.ctx()?, self.config.format, self.config.clear_color)?;
        self.scene = Some(scene);
        Ok(())
    }

    fn create_target(&mut self, width: u32, height: u32) -> Result<()> {
        let desc = TextureDesc::new(width, height, self.config.format);
        let target = TextureResource::new(self.ctx()?, desc)?;
        self.target = Some(target);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let ctx = self.ctx()?;
        let scene = self.scene.as_ref().context("scene not initialized")?;
        let target = self.target.as_ref().context("render target missing")?;
        scene.render(ctx, target);
        Ok(())
    }

    fn read(&mut self, layout: &MemLayout, sink: &mut dyn FnMut(&[u8])) -> Result<bool> {
        let ctx = self.ctx()?;
        let target = self.target.as_ref().context("render target missing")?;

        let Some(mapped) = target.read(ctx, layout, self.config.read_wait)? else {
            return Ok(false);
        };
        mapped.with_bytes(|bytes| sink(bytes));
        Ok(true)
    }

    fn drain(&mut self) {
        if let Some(ctx) = self.ctx.as_ref() {
            ctx.drain(self.config.drain_iterations, self.config.drain_interval);
        }
    }

    fn release(&mut self) {
        self.target = None;
        self.scene = None;
        self.ctx = None;
    }

    fn format(&self) -> PixelFormat {
        self.config.format
    }

    fn shared_texture(&self) -> Option<SharedTextureRef<'_>> {
        let ctx = self.ctx.as_ref()?;
        let target = self.target.as_ref()?;
        let desc = target.desc();
        Some(SharedTextureRef {
            device: ctx.device(),
            queue: ctx.queue(),
            texture: target.texture(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            backend: ctx.backend(),
        })
    }
}
