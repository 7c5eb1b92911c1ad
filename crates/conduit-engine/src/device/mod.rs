//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - compiling shader modules with readable diagnostics
//! - turning wgpu's callback-driven completions into blocking waits

mod context;
mod init;
pub mod wait;

pub use context::{DeviceContext, validate_wgsl};
pub use init::DeviceInit;
pub use wait::{Completion, WaitPolicy, block_on_completion};
