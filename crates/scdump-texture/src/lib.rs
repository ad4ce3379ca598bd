pub mod format;
pub mod sctx;

use anyhow::{ensure, Context};
use format::{Channels, PixelFormat};
use tracing::debug;

/// Edge length of the square blocks tiled textures are stored in.
pub const TILE_SIZE: usize = 32;

/// Decoded texture, tightly packed rows of `channels` bytes per pixel.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub pixels: Vec<u8>,
}

fn pixel_data_size(format: PixelFormat, width: u16, height: u16) -> anyhow::Result<usize> {
    ensure!(
        width > 0 && height > 0,
        "Texture has no pixels ({width}x{height})"
    );
    Ok(width as usize * height as usize * format.bytes_per_pixel())
}

/// Decodes row-major pixel data.
pub fn decode_linear(
    format: PixelFormat,
    width: u16,
    height: u16,
    data: &[u8],
) -> anyhow::Result<Texture> {
    let size = pixel_data_size(format, width, height)?;
    ensure!(
        data.len() >= size,
        "Insufficient data for {width}x{height} {format:?} texture: need {size} bytes, got {}",
        data.len()
    );

    let bpp = format.bytes_per_pixel();
    let channels = format.channels();
    let mut pixels = vec![0u8; width as usize * height as usize * channels.count()];
    for (src, dst) in data[..size]
        .chunks_exact(bpp)
        .zip(pixels.chunks_exact_mut(channels.count()))
    {
        format.convert_pixel(src, dst);
    }

    Ok(Texture {
        width: width as u32,
        height: height as u32,
        channels,
        pixels,
    })
}

/// Decodes pixel data stored in 32x32 blocks.
pub fn decode_tiled(
    format: PixelFormat,
    width: u16,
    height: u16,
    data: &[u8],
) -> anyhow::Result<Texture> {
    debug!("Untiling {width}x{height} texture");
    let linear = untile(data, width as usize, height as usize, format.bytes_per_pixel())
        .context("Failed to untile texture")?;
    decode_linear(format, width, height, &linear)
}

/// Reorders blocks of `TILE_SIZE`x`TILE_SIZE` pixels into plain rows.
///
/// Blocks are stored row-major and clipped at the right and bottom edges.
pub fn untile(data: &[u8], width: usize, height: usize, bpp: usize) -> anyhow::Result<Vec<u8>> {
    let size = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(bpp))
        .context("Texture size overflows")?;
    ensure!(
        data.len() >= size,
        "Insufficient data for {width}x{height} tiled texture: need {size} bytes, got {}",
        data.len()
    );

    let mut out = vec![0u8; size];
    let mut src = 0;

    for block_y in (0..height).step_by(TILE_SIZE) {
        for block_x in (0..width).step_by(TILE_SIZE) {
            let row_len = TILE_SIZE.min(width - block_x) * bpp;
            for y in block_y..(block_y + TILE_SIZE).min(height) {
                ensure!(
                    src + row_len <= data.len(),
                    "Tiled data ends after {} bytes, block ({block_x}, {block_y}) needs more",
                    data.len()
                );
                let dst = (block_x + y * width) * bpp;
                out[dst..dst + row_len].copy_from_slice(&data[src..src + row_len]);
                src += row_len;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_linear_luminance() {
        let texture = decode_linear(PixelFormat::L8, 2, 2, &[1, 2, 3, 4, 99]).unwrap();
        assert_eq!(texture.width, 2);
        assert_eq!(texture.height, 2);
        assert_eq!(texture.channels, Channels::L);
        assert_eq!(texture.pixels, [1, 2, 3, 4]);
    }

    #[test]
    fn linear_rejects_short_data() {
        assert!(decode_linear(PixelFormat::Rgba8888, 2, 2, &[0; 15]).is_err());
    }

    #[test]
    fn rejects_empty_texture() {
        assert!(decode_linear(PixelFormat::L8, 0, 4, &[]).is_err());
    }

    #[test]
    fn untiles_partial_blocks() {
        // 40x33: a full block, a 8 wide block, then a 32x1 and a 8x1 strip
        let (width, height) = (40usize, 33usize);
        let mut tiled = vec![];
        let blocks = [(0, 0, 32, 32), (32, 0, 8, 32), (0, 32, 32, 1), (32, 32, 8, 1)];
        for (block_x, block_y, w, h) in blocks {
            for y in block_y..block_y + h {
                for x in block_x..block_x + w {
                    tiled.push(((x + y * width) % 251) as u8);
                }
            }
        }

        let linear = untile(&tiled, width, height, 1).unwrap();
        let expected = (0..width * height).map(|i| (i % 251) as u8).collect::<Vec<_>>();
        assert_eq!(linear, expected);
    }

    #[test]
    fn untile_respects_pixel_size() {
        // 33x1 with 2 bytes per pixel: a 32 pixel block followed by a single pixel block
        let tiled = (0..66u8).collect::<Vec<_>>();
        assert_eq!(untile(&tiled, 33, 1, 2).unwrap(), tiled);
    }

    #[test]
    fn untile_rejects_short_data() {
        assert!(untile(&[0; 10], 4, 4, 1).is_err());
    }

    #[test]
    fn oversized_tiled_header_fails_without_allocating() {
        let err = decode_tiled(PixelFormat::Rgba8888, 65535, 65535, &[0; 10]).unwrap_err();
        assert!(format!("{err:#}").contains("Insufficient data"));
    }

    #[test]
    fn decodes_tiled_rgb565() {
        let texture = decode_tiled(PixelFormat::Rgb565, 1, 1, &0xF800u16.to_le_bytes()).unwrap();
        assert_eq!(texture.channels, Channels::Rgb);
        assert_eq!(texture.pixels, [0xFF, 0, 0]);
    }
}
