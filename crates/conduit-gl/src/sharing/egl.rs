//! EGLImage sharing for producers on wgpu's GL backend.
//!
//! The surface is a texture owned by the producer's device, exported from the
//! producer's EGL context as an `EGLImage` and bound into a texture of the
//! consumer's context with `glEGLImageTargetTexture2DOES`. Both contexts must
//! live on the same EGL display.

use std::ffi::c_void;

use anyhow::{Context, Result, bail, ensure};
use conduit_engine::wgpu;
use conduit_engine::wgpu::hal::api::Gles;
use conduit_engine::{FrameSource, SharedTextureRef};
use khronos_egl as egl;

use crate::GlFunctions;
use crate::api::GlTexture;

use super::{SharedSurface, SurfaceSharing, copy_into};

const EGL_GL_TEXTURE_2D_KHR: egl::Enum = 0x30B1;
const EGL_IMAGE_PRESERVED_KHR: egl::Int = 0x30D2;
const EGL_NO_IMAGE_KHR: *mut c_void = std::ptr::null_mut();

const REQUIRED_EXTENSIONS: [&str; 2] = ["EGL_KHR_image_base", "EGL_KHR_gl_texture_2D_image"];

type CreateImageKhr = unsafe extern "system" fn(
    display: *mut c_void,
    context: *mut c_void,
    target: egl::Enum,
    buffer: *mut c_void,
    attribs: *const egl::Int,
) -> *mut c_void;
type DestroyImageKhr = unsafe extern "system" fn(display: *mut c_void, image: *mut c_void) -> egl::Boolean;
type ImageTargetTexture2dOes = unsafe extern "system" fn(target: gl::types::GLenum, image: *mut c_void);

/// Extension entry points, resolved during the probe.
#[derive(Clone, Copy)]
struct Entry {
    create_image: CreateImageKhr,
    destroy_image: DestroyImageKhr,
    image_target_texture: ImageTargetTexture2dOes,
}

/// Producer-side EGL handles.
#[derive(Clone, Copy)]
struct Producer {
    display: *mut c_void,
    context: *mut c_void,
}

/// [`SurfaceSharing`] over `EGL_KHR_gl_texture_2D_image`.
pub struct EglSharing {
    egl: egl::DynamicInstance<egl::EGL1_4>,
    entry: Option<Entry>,
}

/// A producer texture exported as an `EGLImage` and its consumer-side alias.
pub struct EglSurface {
    // Keeps the exported GL texture alive for as long as the image exists.
    texture: wgpu::Texture,
    display: *mut c_void,
    image: *mut c_void,
    gl_texture: GlTexture,
    size: (u32, u32),
}

impl SharedSurface for EglSurface {
    fn gl_texture(&self) -> GlTexture {
        self.gl_texture
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// Entry points used to build and free the consumer-side alias.
fn gl_texture_functions_loaded() -> bool {
    gl::GenTextures::is_loaded()
        && gl::BindTexture::is_loaded()
        && gl::TexParameteri::is_loaded()
        && gl::GetError::is_loaded()
        && gl::DeleteTextures::is_loaded()
}

impl EglSharing {
    /// Loads `libEGL` at runtime.
    ///
    /// The consumer-side alias is made through the `gl` crate's global
    /// pointers rather than a [`GlApi`](crate::api::GlApi), so those must be
    /// loaded first; the [`GlFunctions`] argument is proof of that, and the
    /// texture entry points are checked before `libEGL` is touched.
    pub fn load(_gl: &GlFunctions) -> Result<Self> {
        ensure!(
            gl_texture_functions_loaded(),
            "GL texture functions are not loaded"
        );
        let egl = unsafe { egl::DynamicInstance::<egl::EGL1_4>::load_required() }
            .map_err(|err| anyhow::anyhow!("failed to load libEGL: {err}"))?;
        Ok(Self { egl, entry: None })
    }

    fn proc<F: Copy>(&self, name: &str) -> Result<F> {
        let f = self
            .egl
            .get_proc_address(name)
            .with_context(|| format!("{name} is not available"))?;
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of_val(&f));
        // SAFETY: `F` is the documented signature of `name`; both are plain
        // function pointers.
        Ok(unsafe { std::mem::transmute_copy(&f) })
    }

    fn resolve_entry(&self) -> Result<Entry> {
        Ok(Entry {
            create_image: self.proc("eglCreateImageKHR")?,
            destroy_image: self.proc("eglDestroyImageKHR")?,
            image_target_texture: self.proc("glEGLImageTargetTexture2DOES")?,
        })
    }

    fn producer(shared: &SharedTextureRef<'_>) -> Result<Producer> {
        ensure!(
            shared.backend == wgpu::Backend::Gl,
            "producer runs on {:?}, not GL",
            shared.backend
        );

        // SAFETY: the hal device is only read for its EGL handles.
        let hal = unsafe { shared.device.as_hal::<Gles>() }
            .context("producer device is not a GLES device")?;
        let adapter_context = hal.context();
        let display = adapter_context
            .raw_display()
            .context("producer context is not EGL")?
            .as_ptr();
        let context = adapter_context.raw_context();
        ensure!(!context.is_null(), "producer has no EGL context");

        Ok(Producer { display, context })
    }

    fn check_probe(&mut self, shared: &SharedTextureRef<'_>) -> Result<()> {
        let producer = Self::producer(shared)?;

        let current = self
            .egl
            .get_current_display()
            .context("no EGL display is current on this thread")?;
        ensure!(
            current.as_ptr() == producer.display,
            "consumer and producer use different EGL displays"
        );

        // SAFETY: `producer.display` is a live display owned by wgpu.
        let display = unsafe { egl::Display::from_ptr(producer.display) };
        let extensions = self
            .egl
            .query_string(Some(display), egl::EXTENSIONS)
            .context("failed to query EGL extensions")?
            .to_string_lossy();
        let available: Vec<&str> = extensions.split_whitespace().collect();
        for ext in REQUIRED_EXTENSIONS {
            ensure!(available.contains(&ext), "{ext} missing");
        }

        self.entry = Some(self.resolve_entry()?);
        Ok(())
    }
}

fn gl_texture_name(texture: &wgpu::Texture) -> Result<u32> {
    // SAFETY: read-only access to the raw texture name.
    let hal = unsafe { texture.as_hal::<Gles>() }.context("texture is not a GLES texture")?;
    match &hal.inner {
        wgpu::hal::gles::TextureInner::Texture { raw, .. } => Ok(raw.0.get()),
        _ => bail!("texture is not backed by a GL texture object"),
    }
}

impl SurfaceSharing for EglSharing {
    type Surface = EglSurface;

    fn probe(&mut self, source: &dyn FrameSource) -> bool {
        let mut outcome = None;
        source.with_shared_texture(&mut |shared| outcome = Some(self.check_probe(&shared)));

        match outcome {
            Some(Ok(())) => {
                log::info!("EGLImage sharing available");
                true
            }
            Some(Err(err)) => {
                log::info!("EGLImage sharing unavailable: {err:#}");
                false
            }
            None => {
                log::info!("EGLImage sharing unavailable: producer not live");
                false
            }
        }
    }

    fn create_surface(&mut self, shared: &SharedTextureRef<'_>) -> Result<EglSurface> {
        let entry = self.entry.context("EGL sharing was not probed")?;
        let producer = Self::producer(shared)?;

        let texture = shared.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("conduit shared surface"),
            size: wgpu::Extent3d {
                width: shared.width,
                height: shared.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: shared.format.to_wgpu(),
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let name = gl_texture_name(&texture)?;

        let attribs = [EGL_IMAGE_PRESERVED_KHR, egl::TRUE as egl::Int, egl::NONE];
        // SAFETY: display and context are live wgpu handles; `name` is a
        // complete single-level 2D texture in that context.
        let image = unsafe {
            (entry.create_image)(
                producer.display,
                producer.context,
                EGL_GL_TEXTURE_2D_KHR,
                name as usize as *mut c_void,
                attribs.as_ptr(),
            )
        };
        ensure!(image != EGL_NO_IMAGE_KHR, "eglCreateImageKHR failed");

        let mut id = 0;
        // SAFETY: the consumer's context is current on this thread.
        let error = unsafe {
            gl::GenTextures(1, &mut id);
            gl::BindTexture(gl::TEXTURE_2D, id);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as i32);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as i32);
            (entry.image_target_texture)(gl::TEXTURE_2D, image);
            let error = gl::GetError();
            gl::BindTexture(gl::TEXTURE_2D, 0);
            error
        };

        if error != gl::NO_ERROR {
            unsafe {
                gl::DeleteTextures(1, &id);
                (entry.destroy_image)(producer.display, image);
            }
            bail!("glEGLImageTargetTexture2DOES failed (0x{error:04x})");
        }

        Ok(EglSurface {
            texture,
            display: producer.display,
            image,
            gl_texture: GlTexture(id),
            size: (shared.width, shared.height),
        })
    }

    fn blit(&mut self, shared: &SharedTextureRef<'_>, surface: &EglSurface) -> Result<()> {
        copy_into(shared, &surface.texture)
    }

    fn release(&mut self, surface: EglSurface) {
        // SAFETY: the consumer context is current; the image was created on
        // `surface.display` and is released exactly once.
        unsafe {
            gl::DeleteTextures(1, &surface.gl_texture.0);
            if let Some(entry) = self.entry {
                (entry.destroy_image)(surface.display, surface.image);
            }
        }
        drop(surface.texture);
    }
}
