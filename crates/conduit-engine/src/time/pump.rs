use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::frame::CpuImage;
use crate::graphics::FrameSource;

use super::{FrameClock, FrameTime};

/// A frame produced by a pump worker.
#[derive(Debug, Clone)]
pub struct DeliveredFrame {
    pub image: CpuImage,
    pub time: FrameTime,
}

/// Clears the in-flight flag when the worker exits, including by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic frame driver.
///
/// The owner calls [`tick`](Self::tick) from its timer; each tick renders and
/// reads one frame on a worker thread so the owner never blocks on the GPU.
/// Finished frames are collected with [`latest`](Self::latest) on the owner
/// thread. At most one worker runs at a time; ticks that arrive while one is
/// still busy are skipped.
pub struct FramePump<S: FrameSource + ?Sized> {
    source: Arc<S>,
    clock: FrameClock,
    in_flight: Arc<AtomicBool>,
    tx: Sender<DeliveredFrame>,
    rx: Receiver<DeliveredFrame>,
}

impl<S: FrameSource + ?Sized + 'static> FramePump<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            clock: FrameClock::new(),
            in_flight: Arc::new(AtomicBool::new(false)),
            tx,
            rx,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Starts a frame worker. Returns `false` if none was started.
    pub fn tick(&mut self) -> bool {
        if !self.source.is_initialized() {
            return false;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            log::trace!("frame worker still busy; tick skipped");
            return false;
        }

        let time = self.clock.tick();
        let guard = InFlight(Arc::clone(&self.in_flight));
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();

        let spawned = thread::Builder::new()
            .name("conduit-frame".into())
            .spawn(move || {
                let _guard = guard;
                if let Some(image) = source.render_frame_to_image() {
                    // The pump may be gone already; the frame is then dropped.
                    let _ = tx.send(DeliveredFrame { image, time });
                }
            });

        match spawned {
            Ok(_) => true,
            Err(err) => {
                // The closure (and the guard inside it) was dropped with the
                // failed spawn, so the flag is already clear.
                log::warn!("failed to spawn frame worker: {err}");
                false
            }
        }
    }

    /// Newest delivered frame, discarding any older ones still queued.
    pub fn latest(&mut self) -> Option<DeliveredFrame> {
        self.rx.try_iter().last()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Waits up to `timeout` for the current worker to finish.
    ///
    /// Returns `true` once no worker is running.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_in_flight() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }
}
