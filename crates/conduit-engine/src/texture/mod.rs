//! Offscreen render targets and their CPU readback.
//!
//! Readback copies go through a linear buffer whose rows are padded to
//! [`COPY_ROW_ALIGNMENT`]; [`MemLayout`] is the single source of truth for
//! that padding.

mod format;
mod layout;
mod resource;

pub use format::{ChannelOrder, PixelFormat};
pub use layout::{COPY_ROW_ALIGNMENT, MemLayout};
pub use resource::{MappedReadback, TextureDesc, TextureResource};
