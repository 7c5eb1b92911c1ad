//! Headless frame-pump demo.
//!
//! Drives the offscreen producer at ~60 Hz the way a display host would,
//! resizes it halfway through, and writes the last delivered frame to a PNG.
//!
//! Usage: `conduit-studio [output.png]`

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use conduit_engine::logging::{LoggingConfig, init_logging};
use conduit_engine::time::{DeliveredFrame, FramePump};
use conduit_engine::{Graphics, GraphicsConfig};

const TICK: Duration = Duration::from_millis(16);
const TICKS: u32 = 120;
const INITIAL_SIZE: (u32, u32) = (640, 360);
const RESIZED: (u32, u32) = (480, 480);

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let out = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("conduit-frame.png"));

    println!();
    println!("  conduit studio · offscreen wgpu → CPU frames");
    println!();

    let graphics = Arc::new(Graphics::new(GraphicsConfig::default()));
    graphics
        .initialize(INITIAL_SIZE.0, INITIAL_SIZE.1)
        .context("graphics failed to initialize")?;

    let mut pump = FramePump::new(Arc::clone(&graphics));
    let mut last: Option<DeliveredFrame> = None;
    let mut delivered = 0u32;
    let mut skipped = 0u32;

    for n in 0..TICKS {
        if n == TICKS / 2 {
            log::info!("resizing to {}x{}", RESIZED.0, RESIZED.1);
            graphics.resize(RESIZED.0, RESIZED.1);
        }

        if !pump.tick() {
            skipped += 1;
        }
        if let Some(frame) = pump.latest() {
            delivered += 1;
            last = Some(frame);
        }

        thread::sleep(TICK);
    }

    if !pump.wait_idle(Duration::from_secs(2)) {
        log::warn!("frame worker still running at exit");
    }
    if let Some(frame) = pump.latest() {
        delivered += 1;
        last = Some(frame);
    }

    graphics.shutdown();

    println!("  ticks      {TICKS}");
    println!("  delivered  {delivered}");
    println!("  skipped    {skipped}  (worker busy)");

    let frame = last.context("no frame was delivered")?;
    let (width, height) = (frame.image.width(), frame.image.height());
    let pixels = image::RgbaImage::from_raw(width, height, frame.image.into_pixels())
        .context("frame size does not match its pixel data")?;
    pixels
        .save(&out)
        .with_context(|| format!("failed to write {}", out.display()))?;

    println!(
        "  wrote      {} ({width}x{height}, frame #{})",
        out.display(),
        frame.time.frame_index
    );
    println!();
    Ok(())
}
