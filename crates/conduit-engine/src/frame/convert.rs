//! Readback bytes → RGBA8 conversion.
//!
//! The source channel order comes from the texture format, never from an
//! assumption: BGRA targets are common on some backends and would otherwise
//! come out with red and blue swapped.

use crate::texture::{ChannelOrder, MemLayout, PixelFormat};

use super::CpuImage;

/// Converts row-padded readback bytes into `image`, resizing it to the layout.
///
/// `src` must be at least `layout.buffer_size` bytes long; shorter input
/// leaves `image` empty and returns `false`.
pub fn readback_to_image(
    src: &[u8],
    layout: &MemLayout,
    format: PixelFormat,
    image: &mut CpuImage,
) -> bool {
    if layout.is_empty() || (src.len() as u64) < layout.buffer_size {
        image.resize(0, 0);
        return false;
    }

    image.resize(layout.width, layout.height);

    let row_len = layout.unpadded_bytes_per_row() as usize;
    let stride = layout.bytes_per_row as usize;
    let order = format.channel_order();

    for (dst_row, src_row) in image
        .pixels_mut()
        .chunks_exact_mut(row_len)
        .zip(src.chunks(stride))
    {
        convert_row(&src_row[..row_len], dst_row, order);
    }

    true
}

fn convert_row(src: &[u8], dst: &mut [u8], order: ChannelOrder) {
    match order {
        ChannelOrder::Rgba => dst.copy_from_slice(src),
        ChannelOrder::Bgra => {
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                d[0] = s[2];
                d[1] = s[1];
                d[2] = s[0];
                d[3] = s[3];
            }
        }
    }
}
