use anyhow::{Context, Result, ensure};
use conduit_engine::{FrameSource, SharedTextureRef};

use crate::api::{GlApi, GlTexture};
use crate::sharing::{SharedSurface, SurfaceSharing};

use super::FrameStrategy;

/// Zero-copy path: the producer blits its frame into a surface the GL side
/// can sample directly.
///
/// The surface follows the producer's texture size and is recreated when it
/// changes.
pub struct SharedSurfaceStrategy<S: SurfaceSharing> {
    sharing: S,
    surface: Option<S::Surface>,
}

impl<S: SurfaceSharing> SharedSurfaceStrategy<S> {
    pub fn new(sharing: S) -> Self {
        Self {
            sharing,
            surface: None,
        }
    }

    pub fn sharing(&self) -> &S {
        &self.sharing
    }

    pub fn surface(&self) -> Option<&S::Surface> {
        self.surface.as_ref()
    }

    fn drop_surface(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.sharing.release(surface);
        }
    }

    /// Runs `f` against the producer's live texture.
    fn with_target<R>(
        source: &dyn FrameSource,
        mut f: impl FnMut(&SharedTextureRef<'_>) -> Result<R>,
    ) -> Result<R> {
        let mut out = None;
        let live = source.with_shared_texture(&mut |shared| out = Some(f(&shared)));
        ensure!(live, "producer has no shareable texture");
        out.context("producer has no shareable texture")?
    }

    fn ensure_surface(&mut self, source: &dyn FrameSource) -> Result<()> {
        let size = source.texture_size();
        ensure!(size.0 > 0 && size.1 > 0, "producer texture is empty");

        if self.surface.as_ref().is_some_and(|s| s.size() == size) {
            return Ok(());
        }

        self.drop_surface();
        let sharing = &mut self.sharing;
        let surface = Self::with_target(source, |shared| sharing.create_surface(shared))
            .context("failed to create shared surface")?;
        log::debug!("shared surface created ({}x{})", size.0, size.1);
        self.surface = Some(surface);
        Ok(())
    }
}

impl<S: SurfaceSharing, G: GlApi> FrameStrategy<G> for SharedSurfaceStrategy<S> {
    fn name(&self) -> &'static str {
        "shared-surface"
    }

    fn probe(&mut self, source: &dyn FrameSource) -> bool {
        self.sharing.probe(source)
    }

    fn update(&mut self, _gl: &mut G, source: &dyn FrameSource) -> Result<GlTexture> {
        self.ensure_surface(source)?;

        source.render_frame();

        let Self { sharing, surface } = self;
        let surface = surface.as_ref().context("shared surface missing")?;
        Self::with_target(source, |shared| {
            // A resize between sizing and blitting leaves a stale surface.
            ensure!(
                (shared.width, shared.height) == surface.size(),
                "producer texture resized mid-frame"
            );
            sharing.blit(shared, surface)
        })?;

        Ok(surface.gl_texture())
    }

    fn release(&mut self, _gl: &mut G) {
        self.drop_surface();
    }
}
