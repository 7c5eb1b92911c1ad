//! Test doubles for the GL side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use conduit_engine::frame::CpuImage;
use conduit_engine::{FrameSource, SharedTextureRef};

use crate::api::{GlApi, GlGeometry, GlProgram, GlTexture};
use crate::quad::QuadVertex;
use crate::strategy::FrameStrategy;

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateProgram(u32),
    DeleteProgram(u32),
    CreateGeometry(u32),
    DeleteGeometry(u32),
    CreateTexture(u32),
    Upload { texture: u32, width: u32, height: u32, reallocate: bool },
    DeleteTexture(u32),
    Viewport(u32, u32),
    Clear([f32; 4]),
    Draw { texture: u32 },
    // Marker written by `FakeDirect::release` so ordering against GL calls
    // can be asserted.
    DirectReleased,
}

/// Records every call; texture uploads are kept for inspection.
#[derive(Default)]
pub struct RecordingGl {
    pub calls: Arc<Mutex<Vec<GlCall>>>,
    pub uploads: HashMap<u32, (u32, u32, Vec<u8>)>,
    pub compile_error: Option<String>,
    next_name: u32,
}

impl RecordingGl {
    pub fn new() -> Self {
        Self {
            next_name: 1,
            ..Self::default()
        }
    }

    fn name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn push(&self, call: GlCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn draws(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                GlCall::Draw { texture } => Some(texture),
                _ => None,
            })
            .collect()
    }
}

impl GlApi for RecordingGl {
    fn create_program(&mut self, _vertex_src: &str, _fragment_src: &str) -> Result<GlProgram> {
        if let Some(log) = &self.compile_error {
            bail!("fragment shader failed to compile: {log}");
        }
        let name = self.name();
        self.push(GlCall::CreateProgram(name));
        Ok(GlProgram(name))
    }

    fn delete_program(&mut self, program: GlProgram) {
        self.push(GlCall::DeleteProgram(program.0));
    }

    fn create_geometry(&mut self, _vertices: &[QuadVertex], indices: &[u32]) -> Result<GlGeometry> {
        let vao = self.name();
        self.push(GlCall::CreateGeometry(vao));
        Ok(GlGeometry {
            vao,
            vbo: vao + 1000,
            ibo: vao + 2000,
            index_count: indices.len() as i32,
        })
    }

    fn delete_geometry(&mut self, geometry: GlGeometry) {
        self.push(GlCall::DeleteGeometry(geometry.vao));
    }

    fn create_texture(&mut self) -> GlTexture {
        let name = self.name();
        self.push(GlCall::CreateTexture(name));
        GlTexture(name)
    }

    fn upload_rgba(&mut self, texture: GlTexture, width: u32, height: u32, pixels: &[u8], reallocate: bool) {
        self.push(GlCall::Upload {
            texture: texture.0,
            width,
            height,
            reallocate,
        });
        self.uploads.insert(texture.0, (width, height, pixels.to_vec()));
    }

    fn delete_texture(&mut self, texture: GlTexture) {
        self.push(GlCall::DeleteTexture(texture.0));
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.push(GlCall::Viewport(width, height));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.push(GlCall::Clear(color));
    }

    fn draw(&mut self, _program: GlProgram, _geometry: &GlGeometry, texture: GlTexture) {
        self.push(GlCall::Draw { texture: texture.0 });
    }
}

/// Producer that fills every frame with one colour.
pub struct SolidSource {
    pub initialized: AtomicBool,
    pub fail_readback: AtomicBool,
    pub size: Mutex<(u32, u32)>,
    pub color: [u8; 4],
    pub readbacks: AtomicUsize,
}

impl SolidSource {
    pub fn new(width: u32, height: u32, color: [u8; 4]) -> Arc<Self> {
        Arc::new(Self {
            initialized: AtomicBool::new(true),
            fail_readback: AtomicBool::new(false),
            size: Mutex::new((width, height)),
            color,
            readbacks: AtomicUsize::new(0),
        })
    }
}

impl FrameSource for SolidSource {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn texture_size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }

    fn render_frame(&self) {}

    fn render_frame_to_image_into(&self, image: &mut CpuImage) -> bool {
        self.readbacks.fetch_add(1, Ordering::SeqCst);
        if self.fail_readback.load(Ordering::Acquire) {
            return false;
        }
        let (w, h) = self.texture_size();
        image.resize(w, h);
        for px in image.pixels_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&self.color);
        }
        true
    }

    fn with_shared_texture(&self, _f: &mut dyn FnMut(SharedTextureRef<'_>)) -> bool {
        false
    }
}

/// Scripted direct strategy.
pub struct FakeDirect {
    pub probe_result: bool,
    /// Per-update outcomes, consumed front to back; `true` succeeds.
    /// Updates past the end succeed.
    pub script: Arc<Mutex<Vec<bool>>>,
    pub probes: Arc<AtomicUsize>,
    pub updates: Arc<AtomicUsize>,
    pub calls: Arc<Mutex<Vec<GlCall>>>,
}

pub const DIRECT_TEXTURE: u32 = 9000;

impl FakeDirect {
    pub fn new(probe_result: bool, calls: Arc<Mutex<Vec<GlCall>>>) -> Self {
        Self {
            probe_result,
            script: Arc::default(),
            probes: Arc::default(),
            updates: Arc::default(),
            calls,
        }
    }
}

impl<G: GlApi> FrameStrategy<G> for FakeDirect {
    fn name(&self) -> &'static str {
        "fake-direct"
    }

    fn probe(&mut self, _source: &dyn FrameSource) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.probe_result
    }

    fn update(&mut self, _gl: &mut G, _source: &dyn FrameSource) -> Result<GlTexture> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let ok = if script.is_empty() { true } else { script.remove(0) };
        if !ok {
            bail!("surface lost");
        }
        Ok(GlTexture(DIRECT_TEXTURE))
    }

    fn release(&mut self, _gl: &mut G) {
        self.calls.lock().unwrap().push(GlCall::DirectReleased);
    }
}
