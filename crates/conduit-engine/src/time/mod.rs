//! Frame timing and the periodic frame driver.
//!
//! - [`FrameClock`] stamps each tick with a [`FrameTime`]
//! - [`FramePump`] turns ticks into frames rendered on worker threads

mod frame_clock;
mod pump;

pub use frame_clock::{FrameClock, FrameTime};
pub use pump::{DeliveredFrame, FramePump};
