use anyhow::bail;

/// Pixel encodings used by texture chunks, keyed by the chunk's sub type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8888,
    Rgba4444,
    /// 5 bits per colour and a 1-bit alpha in bit 0, unlike older dumpers which read it as 4444.
    Rgba5551,
    Rgb565,
    La88,
    L8,
}

/// Channel layout of decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    L,
    La,
    Rgb,
    Rgba,
}

impl Channels {
    pub fn count(&self) -> usize {
        match self {
            Channels::L => 1,
            Channels::La => 2,
            Channels::Rgb => 3,
            Channels::Rgba => 4,
        }
    }
}

impl PixelFormat {
    pub fn from_sub_type(sub_type: u8) -> anyhow::Result<Self> {
        Ok(match sub_type {
            0 | 1 => PixelFormat::Rgba8888,
            2 => PixelFormat::Rgba4444,
            3 => PixelFormat::Rgba5551,
            4 => PixelFormat::Rgb565,
            6 => PixelFormat::La88,
            10 => PixelFormat::L8,
            _ => bail!("Unknown sub type '{sub_type}'"),
        })
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Rgba4444
            | PixelFormat::Rgba5551
            | PixelFormat::Rgb565
            | PixelFormat::La88 => 2,
            PixelFormat::L8 => 1,
        }
    }

    pub fn channels(&self) -> Channels {
        match self {
            PixelFormat::Rgba8888 | PixelFormat::Rgba4444 | PixelFormat::Rgba5551 => {
                Channels::Rgba
            }
            PixelFormat::Rgb565 => Channels::Rgb,
            PixelFormat::La88 => Channels::La,
            PixelFormat::L8 => Channels::L,
        }
    }

    /// Converts one encoded pixel into `out`, which holds `self.channels().count()` bytes.
    pub fn convert_pixel(&self, src: &[u8], out: &mut [u8]) {
        match self {
            PixelFormat::Rgba8888 | PixelFormat::La88 | PixelFormat::L8 => {
                out.copy_from_slice(src)
            }
            PixelFormat::Rgba4444 => {
                let p = u16::from_le_bytes([src[0], src[1]]);
                out[0] = expand4(p >> 12);
                out[1] = expand4(p >> 8);
                out[2] = expand4(p >> 4);
                out[3] = expand4(p);
            }
            PixelFormat::Rgba5551 => {
                let p = u16::from_le_bytes([src[0], src[1]]);
                out[0] = expand5(p >> 11);
                out[1] = expand5(p >> 6);
                out[2] = expand5(p >> 1);
                out[3] = if p & 1 != 0 { 0xFF } else { 0 };
            }
            PixelFormat::Rgb565 => {
                let p = u16::from_le_bytes([src[0], src[1]]);
                out[0] = expand5(p >> 11);
                out[1] = expand6(p >> 5);
                out[2] = expand5(p);
            }
        }
    }
}

fn expand4(v: u16) -> u8 {
    let v = (v & 0xF) as u8;
    v << 4 | v
}

fn expand5(v: u16) -> u8 {
    let v = (v & 0x1F) as u8;
    v << 3 | v >> 2
}

fn expand6(v: u16) -> u8 {
    let v = (v & 0x3F) as u8;
    v << 2 | v >> 4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(format: PixelFormat, src: &[u8]) -> Vec<u8> {
        let mut out = vec![0; format.channels().count()];
        format.convert_pixel(src, &mut out);
        out
    }

    #[test]
    fn maps_sub_types() {
        assert_eq!(PixelFormat::from_sub_type(0).unwrap(), PixelFormat::Rgba8888);
        assert_eq!(PixelFormat::from_sub_type(1).unwrap(), PixelFormat::Rgba8888);
        assert_eq!(PixelFormat::from_sub_type(4).unwrap(), PixelFormat::Rgb565);
        assert_eq!(PixelFormat::from_sub_type(10).unwrap().bytes_per_pixel(), 1);

        let err = PixelFormat::from_sub_type(5).unwrap_err();
        assert_eq!(err.to_string(), "Unknown sub type '5'");
    }

    #[test]
    fn converts_rgba4444() {
        // r=0xF g=0x8 b=0x1 a=0x0
        assert_eq!(
            convert(PixelFormat::Rgba4444, &0xF810u16.to_le_bytes()),
            [0xFF, 0x88, 0x11, 0x00]
        );
    }

    #[test]
    fn converts_rgba5551() {
        // r=0x1F g=0 b=0x10 a=1
        let p: u16 = 0x1F << 11 | 0x10 << 1 | 1;
        assert_eq!(
            convert(PixelFormat::Rgba5551, &p.to_le_bytes()),
            [0xFF, 0x00, 0x84, 0xFF]
        );
    }

    #[test]
    fn converts_rgb565() {
        let p: u16 = 0x1F << 11 | 0x3F << 5;
        assert_eq!(convert(PixelFormat::Rgb565, &p.to_le_bytes()), [0xFF, 0xFF, 0x00]);
        assert_eq!(convert(PixelFormat::Rgb565, &0x0001u16.to_le_bytes()), [0, 0, 0x08]);
    }

    #[test]
    fn passes_through_byte_formats() {
        assert_eq!(convert(PixelFormat::La88, &[0x40, 0x80]), [0x40, 0x80]);
        assert_eq!(convert(PixelFormat::L8, &[0x7F]), [0x7F]);
        assert_eq!(convert(PixelFormat::Rgba8888, &[1, 2, 3, 4]), [1, 2, 3, 4]);
    }
}
