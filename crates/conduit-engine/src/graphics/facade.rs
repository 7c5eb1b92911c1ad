use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, ensure};

use crate::frame::{CpuImage, readback_to_image};
use crate::texture::{MemLayout, PixelFormat};

use super::{FrameBackend, GraphicsConfig, SharedTextureRef, WgpuBackend};

struct Inner<B> {
    backend: B,
    width: u32,
    height: u32,
}

/// Thread-safe offscreen frame producer.
///
/// Lifecycle and teardown state lives in two atomics so any thread can check
/// it without blocking. Everything that touches GPU objects runs under one
/// mutex; each entry point re-checks the flags after acquiring it, so a
/// shutdown racing a render or resize always wins cleanly.
///
/// Once [`shutdown`](Self::shutdown) has been requested the instance is done:
/// further `initialize` calls fail.
pub struct Graphics<B: FrameBackend = WgpuBackend> {
    initialized: AtomicBool,
    shutdown_requested: AtomicBool,
    inner: Mutex<Inner<B>>,
}

impl Graphics<WgpuBackend> {
    /// Creates an uninitialized producer backed by wgpu.
    pub fn new(config: GraphicsConfig) -> Self {
        Self::with_backend(WgpuBackend::new(config))
    }
}

impl Default for Graphics<WgpuBackend> {
    fn default() -> Self {
        Self::new(GraphicsConfig::default())
    }
}

impl<B: FrameBackend> Graphics<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            initialized: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                backend,
                width: 0,
                height: 0,
            }),
        }
    }

    /// Builds device, scene and a `width` x `height` render target.
    ///
    /// Idempotent: returns `Ok(())` without doing anything once initialized.
    /// A failed step releases whatever the earlier steps created, leaving the
    /// instance uninitialized.
    pub fn initialize(&self, width: u32, height: u32) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        ensure!(
            width > 0 && height > 0,
            "render target must be non-empty (got {width}x{height})"
        );

        let mut inner = self.lock();

        // Another thread may have finished while we waited for the lock.
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        ensure!(
            !self.shutdown_requested.load(Ordering::Acquire),
            "graphics has been shut down"
        );

        if let Err(err) = Self::build(&mut inner.backend, width, height) {
            inner.backend.release();
            return Err(err);
        }

        inner.width = width;
        inner.height = height;
        self.initialized.store(true, Ordering::Release);

        log::info!("graphics initialized ({width}x{height})");
        Ok(())
    }

    /// Recreates the render target at the new size.
    ///
    /// Ignored while uninitialized or shutting down, for zero dimensions, and
    /// when the size is unchanged. If the new target cannot be created the
    /// old one is kept along with its dimensions.
    pub fn resize(&self, width: u32, height: u32) {
        if !self.is_live() || width == 0 || height == 0 {
            return;
        }

        let mut inner = self.lock();
        if !self.is_live() || (inner.width, inner.height) == (width, height) {
            return;
        }

        match inner.backend.create_target(width, height) {
            Ok(()) => {
                log::debug!(
                    "render target resized {}x{} -> {width}x{height}",
                    inner.width,
                    inner.height
                );
                inner.width = width;
                inner.height = height;
            }
            Err(err) => log::warn!("resize to {width}x{height} failed: {err:#}"),
        }
    }

    /// Draws one frame into the render target. No-op unless live.
    pub fn render_frame(&self) {
        if !self.is_live() {
            return;
        }

        let mut inner = self.lock();
        if !self.is_live() {
            return;
        }

        if let Err(err) = inner.backend.render() {
            log::warn!("render failed: {err:#}");
        }
    }

    /// Renders a frame and returns it as an RGBA8 image.
    ///
    /// `None` when not live, or when the readback failed.
    pub fn render_frame_to_image(&self) -> Option<CpuImage> {
        let mut image = CpuImage::default();
        self.render_frame_to_image_into(&mut image).then_some(image)
    }

    /// Like [`render_frame_to_image`](Self::render_frame_to_image), reusing
    /// `image`'s allocation. Returns whether `image` now holds a frame.
    pub fn render_frame_to_image_into(&self, image: &mut CpuImage) -> bool {
        if !self.is_live() {
            return false;
        }

        self.render_frame();

        let mut inner = self.lock();
        if !self.is_live() {
            return false;
        }
        Self::read_locked(&mut inner, image)
    }

    /// Reads the current render target into `image` without rendering first.
    pub fn read_texture_into(&self, image: &mut CpuImage) -> bool {
        if !self.is_live() {
            return false;
        }

        let mut inner = self.lock();
        if !self.is_live() {
            return false;
        }
        Self::read_locked(&mut inner, image)
    }

    /// Tears down GPU state. Safe to call from any thread, any number of times.
    ///
    /// Sets the shutdown flag first so no new work starts, then waits for the
    /// in-progress operation (if any) by taking the mutex, lets pending GPU
    /// callbacks drain for a bounded time, and releases every GPU object.
    pub fn shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);

        let mut inner = self.lock();
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return;
        }

        log::info!("graphics shutting down");
        inner.backend.drain();
        inner.backend.release();
        inner.width = 0;
        inner.height = 0;
        log::debug!("graphics shutdown complete");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Current render-target size; `(0, 0)` before initialization.
    pub fn texture_size(&self) -> (u32, u32) {
        let inner = self.lock();
        (inner.width, inner.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.lock().backend.format()
    }

    /// Runs `f` with the current render target while holding the mutex.
    ///
    /// Returns `None` when not live or when the backend has no texture to share.
    pub fn with_shared_texture<R>(&self, f: impl FnOnce(SharedTextureRef<'_>) -> R) -> Option<R> {
        if !self.is_live() {
            return None;
        }

        let inner = self.lock();
        if !self.is_live() {
            return None;
        }
        inner.backend.shared_texture().map(f)
    }

    fn is_live(&self) -> bool {
        self.initialized.load(Ordering::Acquire) && !self.shutdown_requested.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        // A panic mid-frame leaves nothing half-written that a later call
        // could observe; keep serving frames.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build(backend: &mut B, width: u32, height: u32) -> Result<()> {
        backend.init_device().context("failed to initialize GPU device")?;
        backend.init_scene().context("failed to build scene")?;
        backend
            .create_target(width, height)
            .context("failed to create render target")
    }

    fn read_locked(inner: &mut Inner<B>, image: &mut CpuImage) -> bool {
        let format = inner.backend.format();
        let Some(layout) = MemLayout::new(inner.width, inner.height, format.bytes_per_pixel())
        else {
            log::warn!("{}x{} target is too wide to read back", inner.width, inner.height);
            return false;
        };

        let mut converted = false;
        let read = inner
            .backend
            .read(&layout, &mut |bytes| converted = readback_to_image(bytes, &layout, format, image));

        match read {
            Ok(true) => converted,
            Ok(false) => false,
            Err(err) => {
                log::warn!("frame readback failed: {err:#}");
                false
            }
        }
    }
}

impl<B: FrameBackend> Drop for Graphics<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Condvar};
    use std::thread;
    use std::time::Duration;

    use anyhow::bail;

    use super::*;

    // ── fake backend ─────────────────────────────────────────────────────

    #[derive(Default)]
    struct Calls {
        init_device: usize,
        init_scene: usize,
        create_target: Vec<(u32, u32)>,
        render: usize,
        read: usize,
        drain: usize,
        release: usize,
    }

    /// Holds `drain` until the test opens it.
    #[derive(Default)]
    struct DrainGate {
        state: Mutex<(bool, bool)>, // (entered, open)
        changed: Condvar,
    }

    impl DrainGate {
        fn pass(&self) {
            let mut state = self.state.lock().unwrap();
            state.0 = true;
            self.changed.notify_all();
            while !state.1 {
                state = self.changed.wait(state).unwrap();
            }
        }

        fn wait_entered(&self) {
            let mut state = self.state.lock().unwrap();
            while !state.0 {
                state = self.changed.wait(state).unwrap();
            }
        }

        fn open(&self) {
            self.state.lock().unwrap().1 = true;
            self.changed.notify_all();
        }
    }

    /// Backend that "renders" a solid colour and records every call.
    struct FakeBackend {
        calls: Arc<Mutex<Calls>>,
        format: PixelFormat,
        size: Option<(u32, u32)>,
        fail_scene: bool,
        fail_target_at: Option<(u32, u32)>,
        drain_gate: Option<Arc<DrainGate>>,
    }

    impl FakeBackend {
        fn new(format: PixelFormat) -> (Self, Arc<Mutex<Calls>>) {
            let calls = Arc::new(Mutex::new(Calls::default()));
            let backend = Self {
                calls: Arc::clone(&calls),
                format,
                size: None,
                fail_scene: false,
                fail_target_at: None,
                drain_gate: None,
            };
            (backend, calls)
        }

        fn record(&self, f: impl FnOnce(&mut Calls)) {
            f(&mut self.calls.lock().unwrap());
        }
    }

    // Source pixel written by the fake, in the backend's channel order.
    const FILL: [u8; 4] = [10, 20, 30, 255];

    impl FrameBackend for FakeBackend {
        fn init_device(&mut self) -> Result<()> {
            self.record(|c| c.init_device += 1);
            Ok(())
        }

        fn init_scene(&mut self) -> Result<()> {
            self.record(|c| c.init_scene += 1);
            if self.fail_scene {
                bail!("shader compile error");
            }
            Ok(())
        }

        fn create_target(&mut self, width: u32, height: u32) -> Result<()> {
            self.record(|c| c.create_target.push((width, height)));
            if self.fail_target_at == Some((width, height)) {
                bail!("out of memory");
            }
            self.size = Some((width, height));
            Ok(())
        }

        fn render(&mut self) -> Result<()> {
            self.record(|c| c.render += 1);
            Ok(())
        }

        fn read(&mut self, layout: &MemLayout, sink: &mut dyn FnMut(&[u8])) -> Result<bool> {
            self.record(|c| c.read += 1);
            if layout.is_empty() {
                return Ok(false);
            }
            assert_eq!(Some((layout.width, layout.height)), self.size);

            let mut bytes = vec![0u8; layout.buffer_size as usize];
            for y in 0..layout.height {
                for x in 0..layout.width {
                    let at = layout.offset_of(x, y);
                    bytes[at..at + 4].copy_from_slice(&FILL);
                }
            }
            sink(&bytes);
            Ok(true)
        }

        fn drain(&mut self) {
            self.record(|c| c.drain += 1);
            if let Some(gate) = &self.drain_gate {
                gate.pass();
            }
        }

        fn release(&mut self) {
            self.record(|c| c.release += 1);
            self.size = None;
        }

        fn format(&self) -> PixelFormat {
            self.format
        }
    }

    fn graphics() -> (Graphics<FakeBackend>, Arc<Mutex<Calls>>) {
        let (backend, calls) = FakeBackend::new(PixelFormat::Rgba8Unorm);
        (Graphics::with_backend(backend), calls)
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    #[test]
    fn initialize_is_idempotent() {
        let (g, calls) = graphics();
        g.initialize(64, 32).unwrap();
        g.initialize(128, 128).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.init_device, 1);
        assert_eq!(calls.init_scene, 1);
        assert_eq!(calls.create_target, vec![(64, 32)]);
        drop(calls);
        assert_eq!(g.texture_size(), (64, 32));
    }

    #[test]
    fn initialize_rejects_empty_size() {
        let (g, calls) = graphics();
        assert!(g.initialize(0, 10).is_err());
        assert!(!g.is_initialized());
        assert_eq!(calls.lock().unwrap().init_device, 0);
    }

    #[test]
    fn failed_initialize_releases_partial_state() {
        let (mut backend, calls) = FakeBackend::new(PixelFormat::Rgba8Unorm);
        backend.fail_scene = true;
        let g = Graphics::with_backend(backend);

        let err = g.initialize(16, 16).unwrap_err();
        assert!(format!("{err:#}").contains("shader compile error"));
        assert!(!g.is_initialized());
        assert!(g.render_frame_to_image().is_none());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.release, 1);
        assert!(calls.create_target.is_empty());
    }

    #[test]
    fn calls_before_initialize_are_noops() {
        let (g, calls) = graphics();
        g.render_frame();
        g.resize(10, 10);
        assert!(g.render_frame_to_image().is_none());
        assert_eq!(g.texture_size(), (0, 0));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.render, 0);
        assert_eq!(calls.read, 0);
        assert!(calls.create_target.is_empty());
    }

    // ── resize ───────────────────────────────────────────────────────────

    #[test]
    fn resize_changes_image_dimensions() {
        let (g, _) = graphics();
        g.initialize(100, 100).unwrap();
        let first = g.render_frame_to_image().unwrap();
        assert_eq!((first.width(), first.height()), (100, 100));
        let first_pixels = first.pixels().to_vec();

        g.resize(50, 200);
        let image = g.render_frame_to_image().unwrap();
        assert_eq!((image.width(), image.height()), (50, 200));
        assert_eq!(image.pixels().len(), 50 * 200 * 4);

        // Images already handed out are owned by the caller.
        assert_eq!((first.width(), first.height()), (100, 100));
        assert_eq!(first.pixels(), &first_pixels[..]);
    }

    #[test]
    fn resize_ignores_zero_and_unchanged_sizes() {
        let (g, calls) = graphics();
        g.initialize(40, 30).unwrap();
        g.resize(0, 30);
        g.resize(40, 0);
        g.resize(40, 30);

        assert_eq!(calls.lock().unwrap().create_target, vec![(40, 30)]);
        assert_eq!(g.texture_size(), (40, 30));
    }

    #[test]
    fn failed_resize_keeps_previous_target() {
        let (mut backend, _) = FakeBackend::new(PixelFormat::Rgba8Unorm);
        backend.fail_target_at = Some((9000, 9000));
        let g = Graphics::with_backend(backend);
        g.initialize(8, 8).unwrap();

        g.resize(9000, 9000);
        assert_eq!(g.texture_size(), (8, 8));
        let image = g.render_frame_to_image().unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }

    // ── readback ─────────────────────────────────────────────────────────

    #[test]
    fn render_to_image_renders_then_reads() {
        let (g, calls) = graphics();
        g.initialize(3, 2).unwrap();

        let image = g.render_frame_to_image().unwrap();
        assert_eq!(image.pixel(2, 1), Some(FILL));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.render, 1);
        assert_eq!(calls.read, 1);
    }

    #[test]
    fn bgra_target_comes_out_as_rgba() {
        let (backend, _) = FakeBackend::new(PixelFormat::Bgra8Unorm);
        let g = Graphics::with_backend(backend);
        g.initialize(4, 4).unwrap();

        let image = g.render_frame_to_image().unwrap();
        assert_eq!(image.pixel(0, 0), Some([FILL[2], FILL[1], FILL[0], FILL[3]]));
    }

    #[test]
    fn read_texture_does_not_render() {
        let (g, calls) = graphics();
        g.initialize(2, 2).unwrap();

        let mut image = CpuImage::default();
        assert!(g.read_texture_into(&mut image));
        assert_eq!(calls.lock().unwrap().render, 0);
    }

    // ── shutdown ─────────────────────────────────────────────────────────

    #[test]
    fn shutdown_drains_then_releases_once() {
        let (g, calls) = graphics();
        g.initialize(8, 8).unwrap();
        g.shutdown();
        g.shutdown();

        assert!(!g.is_initialized());
        let calls = calls.lock().unwrap();
        assert_eq!(calls.drain, 1);
        assert_eq!(calls.release, 1);
    }

    #[test]
    fn nothing_touches_the_gpu_after_shutdown() {
        let (g, calls) = graphics();
        g.initialize(8, 8).unwrap();
        g.shutdown();

        let before = calls.lock().unwrap().render;
        g.render_frame();
        g.resize(16, 16);
        assert!(g.render_frame_to_image().is_none());
        assert!(g.with_shared_texture(|_| ()).is_none());

        let calls = calls.lock().unwrap();
        assert_eq!(calls.render, before);
        assert_eq!(calls.read, 0);
        assert_eq!(calls.create_target, vec![(8, 8)]);
    }

    #[test]
    fn frames_are_refused_while_shutdown_drains() {
        let (mut backend, calls) = FakeBackend::new(PixelFormat::Rgba8Unorm);
        let gate = Arc::new(DrainGate::default());
        backend.drain_gate = Some(Arc::clone(&gate));
        let g = Arc::new(Graphics::with_backend(backend));
        g.initialize(8, 8).unwrap();
        assert!(g.render_frame_to_image().is_some());

        let stopper = {
            let g = Arc::clone(&g);
            thread::spawn(move || g.shutdown())
        };
        gate.wait_entered();
        assert!(g.is_shutdown_requested());

        let (render, read) = {
            let calls = calls.lock().unwrap();
            (calls.render, calls.read)
        };

        // Shutdown holds the lock while it drains; frame calls must return
        // without waiting for it.
        let (tx, rx) = mpsc::channel();
        {
            let g = Arc::clone(&g);
            thread::spawn(move || {
                g.render_frame();
                let image = g.render_frame_to_image();
                let _ = tx.send(image.is_none());
            });
        }
        let refused = rx.recv_timeout(Duration::from_secs(5));
        assert_eq!(refused, Ok(true));

        {
            let calls = calls.lock().unwrap();
            assert_eq!((calls.render, calls.read), (render, read));
            assert_eq!(calls.release, 0);
        }

        gate.open();
        stopper.join().unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls.drain, 1);
        assert_eq!(calls.release, 1);
        assert_eq!((calls.render, calls.read), (render, read));
    }

    #[test]
    fn initialize_after_shutdown_fails() {
        let (g, _) = graphics();
        g.initialize(8, 8).unwrap();
        g.shutdown();
        assert!(g.initialize(8, 8).is_err());
    }

    #[test]
    fn shutdown_before_initialize_is_harmless() {
        let (g, calls) = graphics();
        g.shutdown();
        assert_eq!(calls.lock().unwrap().release, 0);
        assert!(g.initialize(4, 4).is_err());
    }

    // ── concurrency ──────────────────────────────────────────────────────

    #[test]
    fn concurrent_frames_resizes_and_shutdown() {
        let (g, calls) = graphics();
        let g = Arc::new(g);
        g.initialize(32, 32).unwrap();

        let mut workers = Vec::new();
        for i in 0..4u32 {
            let g = Arc::clone(&g);
            workers.push(thread::spawn(move || {
                let mut image = CpuImage::default();
                for n in 0..50u32 {
                    if g.render_frame_to_image_into(&mut image) {
                        // A frame is always internally consistent.
                        assert_eq!(
                            image.pixels().len(),
                            (image.width() * image.height() * 4) as usize
                        );
                    }
                    if n % 10 == i {
                        g.resize(16 + n, 16 + i);
                    }
                }
            }));
        }

        g.shutdown();
        for worker in workers {
            worker.join().unwrap();
        }

        assert!(!g.is_initialized());
        assert_eq!(calls.lock().unwrap().release, 1);
    }
}
