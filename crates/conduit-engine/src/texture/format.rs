/// Byte order of the four channels in a pixel.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
}

/// Render-target formats supported by the readback path.
///
/// All of them are 4 bytes per pixel. The sRGB variants differ only in how the
/// GPU encodes shader output; the stored bytes are read back unchanged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PixelFormat {
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
}

impl PixelFormat {
    pub const BYTES_PER_PIXEL: u32 = 4;

    #[inline]
    pub fn bytes_per_pixel(self) -> u32 {
        Self::BYTES_PER_PIXEL
    }

    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            Self::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            Self::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            Self::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        }
    }

    /// Maps a wgpu format back, if it is one of the supported ones.
    pub fn from_wgpu(format: wgpu::TextureFormat) -> Option<Self> {
        match format {
            wgpu::TextureFormat::Rgba8Unorm => Some(Self::Rgba8Unorm),
            wgpu::TextureFormat::Rgba8UnormSrgb => Some(Self::Rgba8UnormSrgb),
            wgpu::TextureFormat::Bgra8Unorm => Some(Self::Bgra8Unorm),
            wgpu::TextureFormat::Bgra8UnormSrgb => Some(Self::Bgra8UnormSrgb),
            _ => None,
        }
    }

    /// Channel order of the bytes the GPU writes for this format.
    pub fn channel_order(self) -> ChannelOrder {
        match self {
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb => ChannelOrder::Rgba,
            Self::Bgra8Unorm | Self::Bgra8UnormSrgb => ChannelOrder::Bgra,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgpu_mapping_round_trips() {
        for f in [
            PixelFormat::Rgba8Unorm,
            PixelFormat::Rgba8UnormSrgb,
            PixelFormat::Bgra8Unorm,
            PixelFormat::Bgra8UnormSrgb,
        ] {
            assert_eq!(PixelFormat::from_wgpu(f.to_wgpu()), Some(f));
        }
    }

    #[test]
    fn unsupported_wgpu_format_is_none() {
        assert_eq!(PixelFormat::from_wgpu(wgpu::TextureFormat::R8Unorm), None);
    }

    #[test]
    fn bgra_family_reports_bgra_order() {
        assert_eq!(PixelFormat::Bgra8Unorm.channel_order(), ChannelOrder::Bgra);
        assert_eq!(PixelFormat::Bgra8UnormSrgb.channel_order(), ChannelOrder::Bgra);
        assert_eq!(PixelFormat::Rgba8UnormSrgb.channel_order(), ChannelOrder::Rgba);
    }
}
