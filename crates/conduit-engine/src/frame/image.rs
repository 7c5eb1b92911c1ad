/// CPU-side RGBA8 image.
///
/// Rows are top-to-bottom and tightly packed (`width * 4` bytes per row).
/// Channel order is always RGBA regardless of the GPU format it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl CpuImage {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Creates a zero-filled image.
    pub fn new(width: u32, height: u32) -> Self {
        let mut image = Self::default();
        image.resize(width, height);
        image
    }

    /// Wraps existing RGBA8 bytes. Returns `None` if the length does not match.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == Self::byte_len(width, height)).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::BYTES_PER_PIXEL
    }

    /// Resizes to `width x height`.
    ///
    /// Storage is reused; the allocation only grows when the new size needs
    /// more capacity than was ever held. Contents are unspecified afterwards.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.resize(Self::byte_len(width, height), 0);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Returns the RGBA value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        let p = &self.pixels[i..i + Self::BYTES_PER_PIXEL];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Current allocation size in bytes.
    pub fn capacity(&self) -> usize {
        self.pixels.capacity()
    }
}
