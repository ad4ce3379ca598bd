use std::io::Cursor;

use anyhow::{ensure, Context};
use binrw::{binread, BinReaderExt};
use tracing::debug;

use crate::{format::Channels, Texture};

/// SCTX payloads are always ASTC with this footprint.
pub const ASTC_BLOCK_SIZE: u32 = 8;
const ASTC_BLOCK_BYTES: usize = 16;

#[binread]
#[br(little)]
#[derive(Debug)]
pub struct SctxHeader {
    pub magic: [u8; 12],
    #[br(pad_before = 40)]
    pub width: u16,
    pub height: u16,
    #[br(temp, pad_before = 24)]
    metadata_len: u32,
    #[br(count = metadata_len as usize, pad_after = 52)]
    pub metadata: Vec<u8>,
    /// Start of the compressed texture data, which runs to the end of the blob
    pub payload_offset: binrw::PosValue<()>,
}

/// Decodes a complete SCTX blob into an RGBA texture.
pub fn decode_sctx(bytes: &[u8]) -> anyhow::Result<Texture> {
    let mut c = Cursor::new(bytes);
    let header: SctxHeader = c.read_le().context("Failed to read SCTX header")?;
    debug!(
        "SCTX {}x{}, {} metadata bytes, payload at 0x{:X}",
        header.width,
        header.height,
        header.metadata.len(),
        header.payload_offset.pos
    );

    let payload = bytes
        .get(header.payload_offset.pos as usize..)
        .filter(|p| !p.is_empty())
        .context("SCTX blob has no texture data")?;
    let data = scdump_sc::compression::decompress(payload)
        .context("Failed to decompress SCTX texture data")?;

    decode_astc(&data, header.width as u32, header.height as u32)
}

/// Decodes LDR ASTC data with an 8x8 footprint into RGBA8.
pub fn decode_astc(data: &[u8], width: u32, height: u32) -> anyhow::Result<Texture> {
    ensure!(width > 0 && height > 0, "Texture has no pixels ({width}x{height})");

    let blocks =
        width.div_ceil(ASTC_BLOCK_SIZE) as usize * height.div_ceil(ASTC_BLOCK_SIZE) as usize;
    ensure!(
        data.len() >= blocks * ASTC_BLOCK_BYTES,
        "Insufficient data for {width}x{height} ASTC texture: need {} bytes, got {}",
        blocks * ASTC_BLOCK_BYTES,
        data.len()
    );

    debug!("Using ASTC software decoder");
    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    astc_decode::astc_decode(
        Cursor::new(data),
        width,
        height,
        astc_decode::Footprint::ASTC_8X8,
        |x, y, pixel| {
            let offset = (y * width + x) as usize * 4;
            pixels[offset..offset + 4].copy_from_slice(&pixel);
        },
    )?;

    Ok(Texture {
        width,
        height,
        channels: Channels::Rgba,
        pixels,
    })
}
