/// Row stride alignment required by texture-to-buffer copies.
///
/// Matches `wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`; consumers index readback bytes
/// with strides derived from it, so it must stay bit-exact.
pub const COPY_ROW_ALIGNMENT: u32 = 256;

/// Memory layout of a texture copied into a linear buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemLayout {
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
    /// Smallest multiple of [`COPY_ROW_ALIGNMENT`] holding one row.
    pub bytes_per_row: u32,
    /// `bytes_per_row * height`.
    pub buffer_size: u64,
}

impl MemLayout {
    /// Returns `None` when a padded row does not fit in `u32`, which is the
    /// stride type texture copies take.
    pub fn new(width: u32, height: u32, bytes_per_pixel: u32) -> Option<Self> {
        let bytes_per_row = aligned_bytes_per_row(width, bytes_per_pixel)?;
        Some(Self {
            width,
            height,
            bytes_per_pixel,
            bytes_per_row,
            buffer_size: bytes_per_row as u64 * height as u64,
        })
    }

    /// Bytes of actual pixel data in one row (no padding).
    #[inline]
    pub fn unpadded_bytes_per_row(&self) -> u32 {
        self.width * self.bytes_per_pixel
    }

    /// `true` when there is nothing to copy.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte offset of pixel `(x, y)` in the padded buffer.
    #[inline]
    pub fn offset_of(&self, x: u32, y: u32) -> usize {
        y as usize * self.bytes_per_row as usize + x as usize * self.bytes_per_pixel as usize
    }
}

fn aligned_bytes_per_row(width: u32, bytes_per_pixel: u32) -> Option<u32> {
    let unaligned = width.checked_mul(bytes_per_pixel)?;
    unaligned
        .div_ceil(COPY_ROW_ALIGNMENT)
        .checked_mul(COPY_ROW_ALIGNMENT)
}
