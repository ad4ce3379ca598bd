//! Builders for synthetic containers, shared by the test suites of this workspace.

use std::io::Cursor;

use crate::SC_MAGIC;

fn splice_size(standard: &[u8], size: u32) -> Vec<u8> {
    // lzma-rs writes a 64-bit size, Supercell keeps only 32 bits of it
    let mut out = standard[..5].to_vec();
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&standard[13..]);
    out
}

/// LZMA in Supercell's layout with the size left unknown, the stream ends with an end marker.
pub fn sc_lzma(data: &[u8]) -> Vec<u8> {
    let mut standard = vec![];
    lzma_rs::lzma_compress(&mut Cursor::new(data), &mut standard).unwrap();
    splice_size(&standard, u32::MAX)
}

/// LZMA in Supercell's layout with the real uncompressed size in the header.
pub fn sc_lzma_sized(data: &[u8]) -> Vec<u8> {
    let options = lzma_rs::compress::Options {
        unpacked_size: lzma_rs::compress::UnpackedSize::WriteToHeader(Some(data.len() as u64)),
    };
    let mut standard = vec![];
    lzma_rs::lzma_compress_with_options(&mut Cursor::new(data), &mut standard, &options)
        .unwrap();
    splice_size(&standard, data.len() as u32)
}

/// Builds an `.sc` file around `body`, optionally with a wrong hash.
pub fn build_sc(body: &[u8], corrupt_hash: bool) -> Vec<u8> {
    let mut hash = md5::compute(body).0.to_vec();
    if corrupt_hash {
        hash[0] ^= 0xFF;
    }

    let mut out = SC_MAGIC.to_vec();
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&(hash.len() as u32).to_be_bytes());
    out.extend_from_slice(&hash);
    out.extend_from_slice(&sc_lzma_sized(body));
    out
}

/// Tag, little-endian length, body.
pub fn chunk(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// A texture chunk: sub type, width, height, pixels.
pub fn texture_chunk(tag: u8, sub_type: u8, width: u16, height: u16, pixels: &[u8]) -> Vec<u8> {
    let mut body = vec![sub_type];
    body.extend_from_slice(&width.to_le_bytes());
    body.extend_from_slice(&height.to_le_bytes());
    body.extend_from_slice(pixels);
    chunk(tag, &body)
}
