use std::sync::Arc;

use anyhow::{Context, Result};
use conduit_engine::FrameSource;

use crate::api::{GlApi, GlGeometry, GlProgram, GlTexture};
use crate::quad::{QUAD_FRAGMENT_SHADER, QUAD_INDICES, QUAD_VERTEX_SHADER, QUAD_VERTICES};
use crate::sharing::Unsupported;
use crate::strategy::{CpuCopyStrategy, FrameStrategy, SharedSurfaceStrategy};

const CLEAR_BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Displays a producer's frames in a host GL context.
///
/// Lives on the GL thread and is driven by the host's context callbacks:
/// [`initialise`](Self::initialise) when the context is created,
/// [`render`](Self::render) per paint, [`resized`](Self::resized) on size
/// changes and [`shutdown`](Self::shutdown) before the context goes away.
/// GL objects are only released by `shutdown`; dropping the bridge without
/// it leaks them, since the context may no longer be current by then.
///
/// Each frame goes through the direct (shared-surface) strategy when the
/// probe at initialisation succeeded. If the direct path fails for a frame,
/// that frame goes through the CPU copy instead; the next frame tries the
/// direct path again.
pub struct InteropBridge<G: GlApi> {
    gl: G,
    source: Option<Arc<dyn FrameSource>>,
    direct: Box<dyn FrameStrategy<G>>,
    cpu: CpuCopyStrategy,
    program: Option<GlProgram>,
    geometry: Option<GlGeometry>,
    direct_capable: bool,
    initialised: bool,
    viewport: Option<(u32, u32)>,
}

impl<G: GlApi> InteropBridge<G> {
    /// Bridge with no shared-surface primitive; every frame is CPU-copied.
    pub fn new(gl: G) -> Self {
        Self::with_direct(gl, SharedSurfaceStrategy::new(Unsupported))
    }

    /// Bridge using `direct` whenever its probe succeeds.
    pub fn with_direct(gl: G, direct: impl FrameStrategy<G> + 'static) -> Self {
        Self {
            gl,
            source: None,
            direct: Box::new(direct),
            cpu: CpuCopyStrategy::new(),
            program: None,
            geometry: None,
            direct_capable: false,
            initialised: false,
            viewport: None,
        }
    }

    /// Attaches the producer. Takes effect for the direct path at the next
    /// [`initialise`](Self::initialise).
    pub fn bind(&mut self, source: Arc<dyn FrameSource>) {
        self.source = Some(source);
    }

    pub fn gl(&self) -> &G {
        &self.gl
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Whether frames currently take the direct path.
    pub fn uses_direct_path(&self) -> bool {
        self.direct_capable
    }

    /// Builds the quad program and buffers and probes the direct path.
    ///
    /// With no producer bound yet the probe fails and the CPU path is used
    /// until the next initialisation. On error the bridge stays
    /// uninitialised and `render` does nothing.
    pub fn initialise(&mut self) -> Result<()> {
        if self.initialised {
            return Ok(());
        }

        let program = match self.gl.create_program(QUAD_VERTEX_SHADER, QUAD_FRAGMENT_SHADER) {
            Ok(program) => program,
            Err(err) => {
                log::error!("quad shader failed to build: {err:#}");
                return Err(err.context("quad shader failed to build"));
            }
        };

        let geometry = match self
            .gl
            .create_geometry(&QUAD_VERTICES, &QUAD_INDICES)
            .context("failed to create quad buffers")
        {
            Ok(geometry) => geometry,
            Err(err) => {
                self.gl.delete_program(program);
                return Err(err);
            }
        };

        self.program = Some(program);
        self.geometry = Some(geometry);

        self.direct_capable = match self.source.as_deref() {
            Some(source) => self.direct.probe(source),
            None => false,
        };
        log::info!(
            "interop bridge initialised ({} path)",
            if self.direct_capable { self.direct.name() } else { "cpu-copy" }
        );

        if let Some((width, height)) = self.viewport {
            self.gl.viewport(width, height);
        }

        self.initialised = true;
        Ok(())
    }

    /// Draws the producer's next frame over a black background.
    pub fn render(&mut self) {
        if !self.initialised {
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };
        if !source.is_initialized() {
            return;
        }

        let texture = self.frame_texture(source.as_ref());

        self.gl.clear(CLEAR_BLACK);
        if let (Some(texture), Some(program), Some(geometry)) = (texture, self.program, self.geometry.as_ref()) {
            self.gl.draw(program, geometry, texture);
        }
    }

    fn frame_texture(&mut self, source: &dyn FrameSource) -> Option<GlTexture> {
        if self.direct_capable {
            match self.direct.update(&mut self.gl, source) {
                Ok(texture) => return Some(texture),
                Err(err) => log::warn!(
                    "{} path failed, CPU copy for this frame: {err:#}",
                    self.direct.name()
                ),
            }
        }

        match FrameStrategy::<G>::update(&mut self.cpu, &mut self.gl, source) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::debug!("no frame this paint: {err:#}");
                None
            }
        }
    }

    /// Records the surface size and applies it if initialised.
    pub fn resized(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
        if self.initialised {
            self.gl.viewport(width, height);
        }
    }

    /// Releases every GL object. The next `initialise` probes again.
    pub fn shutdown(&mut self) {
        if !self.initialised {
            return;
        }

        if let Some(program) = self.program.take() {
            self.gl.delete_program(program);
        }
        FrameStrategy::<G>::release(&mut self.cpu, &mut self.gl);
        if let Some(geometry) = self.geometry.take() {
            self.gl.delete_geometry(geometry);
        }
        self.direct.release(&mut self.gl);

        self.direct_capable = false;
        self.initialised = false;
        log::debug!("interop bridge shut down");
    }
}
