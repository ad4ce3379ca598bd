use std::io::{Cursor, Read};

use anyhow::{bail, ensure, Context};
use tracing::debug;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const LZHAM_MAGIC: &[u8; 4] = b"SCLZ";

/// Highest valid LZMA properties byte, `(pb * 5 + lp) * 9 + lc` with every field at its maximum.
const LZMA_MAX_PROPERTIES: u8 = (4 * 5 + 4) * 9 + 8;
/// Properties byte + dictionary size + 32-bit uncompressed size.
const LZMA_HEADER_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Lzham,
    Zstd,
    Zlib,
    Lzma,
}

impl CompressionType {
    pub fn detect_from_slice(buf: &[u8]) -> Option<CompressionType> {
        if buf.starts_with(LZHAM_MAGIC) {
            return Some(CompressionType::Lzham);
        }

        if buf.starts_with(&ZSTD_MAGIC) {
            return Some(CompressionType::Zstd);
        }

        if buf.len() >= 2 && is_zlib_header(buf[0], buf[1]) {
            return Some(CompressionType::Zlib);
        }

        // Supercell's LZMA header has no magic, anything long enough to hold one is assumed LZMA
        if buf.len() >= LZMA_HEADER_SIZE {
            return Some(CompressionType::Lzma);
        }

        None
    }
}

fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == 8 && u16::from_be_bytes([cmf, flg]) % 31 == 0
}

/// Decompresses the given buffer, picking the codec from its leading bytes.
pub fn decompress(buf: &[u8]) -> anyhow::Result<Vec<u8>> {
    match CompressionType::detect_from_slice(buf) {
        Some(CompressionType::Lzham) => {
            ensure!(buf.len() >= 9, "LZHAM header is truncated");
            let dict_size_log2 = buf[4];
            let uncompressed_size = u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]);
            debug!("Decompressing using LZHAM ...");
            debug!("dict size: {dict_size_log2}");
            debug!("uncompressed size: {uncompressed_size}");

            bail!("LZHAM compression is not supported")
        }
        Some(CompressionType::Zstd) => {
            debug!("Decompressing using ZSTD ...");
            let mut out_buf = vec![];
            let mut decompressor = zstd::stream::Decoder::new(Cursor::new(buf))?;
            decompressor.read_to_end(&mut out_buf).context("zstd")?;

            Ok(out_buf)
        }
        Some(CompressionType::Zlib) => {
            debug!("Decompressing using ZLIB ...");
            let mut decompressor = flate2::read::ZlibDecoder::new(Cursor::new(buf));
            let mut out_buf = vec![];
            decompressor.read_to_end(&mut out_buf).context("zlib")?;

            Ok(out_buf)
        }
        Some(CompressionType::Lzma) => decompress_lzma(buf),
        None => bail!("Buffer is too small to hold a compressed stream"),
    }
}

fn decompress_lzma(buf: &[u8]) -> anyhow::Result<Vec<u8>> {
    debug!("Decompressing using LZMA ...");

    let mut properties = buf[0];
    ensure!(properties <= LZMA_MAX_PROPERTIES, "LZMA properties error");
    let pb = properties / (9 * 5);
    properties -= pb * 9 * 5;
    let lp = properties / 9;
    let lc = properties - lp * 9;
    debug!("literal context bits: {lc}");
    debug!("literal position bits: {lp}");
    debug!("position bits: {pb}");

    let dictionary_size = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
    debug!("dictionary size: {dictionary_size}");

    let uncompressed_size = u32::from_le_bytes([buf[5], buf[6], buf[7], buf[8]]);
    debug!("uncompressed size: {uncompressed_size}");

    // lzma-rs expects the size field to be absent when it is provided out of band
    let mut reader = (&buf[..5]).chain(&buf[LZMA_HEADER_SIZE..]);
    let options = lzma_rs::decompress::Options {
        unpacked_size: lzma_rs::decompress::UnpackedSize::UseProvided(
            (uncompressed_size != u32::MAX).then_some(uncompressed_size as u64),
        ),
        memlimit: None,
        allow_incomplete: false,
    };

    let mut decompressed = Vec::with_capacity(if uncompressed_size == u32::MAX {
        0
    } else {
        (uncompressed_size as usize).min(buf.len().saturating_mul(32))
    });
    lzma_rs::lzma_decompress_with_options(&mut reader, &mut decompressed, &options)
        .context("lzma")?;

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::fixtures::{sc_lzma, sc_lzma_sized};

    const TABLE: &[u8] = b"\"Name\",\"Hitpoints\"\n\"String\",\"int\"\n\"Knight\",1450\n";

    #[test]
    fn detects_codecs() {
        assert_eq!(
            CompressionType::detect_from_slice(b"SCLZ\x12\0\0\0\0"),
            Some(CompressionType::Lzham)
        );
        assert_eq!(
            CompressionType::detect_from_slice(&[0x28, 0xB5, 0x2F, 0xFD, 0x00]),
            Some(CompressionType::Zstd)
        );
        assert_eq!(
            CompressionType::detect_from_slice(&[0x78, 0x9C, 0x03, 0x00]),
            Some(CompressionType::Zlib)
        );
        assert_eq!(
            CompressionType::detect_from_slice(&[0x5D, 0, 0, 4, 0, 0x10, 0, 0, 0, 0]),
            Some(CompressionType::Lzma)
        );
        assert_eq!(CompressionType::detect_from_slice(&[0x5D, 0, 0]), None);
    }

    #[test]
    fn decompresses_lzma() {
        let compressed = sc_lzma(TABLE);
        assert_eq!(compressed[0], 0x5D);
        assert_eq!(decompress(&compressed).unwrap(), TABLE);
    }

    #[test]
    fn decompresses_lzma_with_known_size() {
        let table = TABLE.repeat(100);
        let compressed = sc_lzma_sized(&table);
        assert_eq!(
            u32::from_le_bytes([compressed[5], compressed[6], compressed[7], compressed[8]]),
            table.len() as u32
        );
        assert_eq!(decompress(&compressed).unwrap(), table);
    }

    #[test]
    fn decompresses_zstd() {
        let compressed = zstd::encode_all(Cursor::new(TABLE), 0).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), TABLE);
    }

    #[test]
    fn decompresses_zlib() {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(TABLE).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decompress(&compressed).unwrap(), TABLE);
    }

    #[test]
    fn rejects_bad_lzma_properties() {
        let mut compressed = sc_lzma(TABLE);
        compressed[0] = 0xE1;
        let err = decompress(&compressed).unwrap_err();
        assert_eq!(err.to_string(), "LZMA properties error");
    }

    #[test]
    fn lzham_is_reported_as_unsupported() {
        let err = decompress(b"SCLZ\x14\x10\0\0\0rest").unwrap_err();
        assert!(err.to_string().contains("LZHAM"));
    }

    #[test]
    fn empty_input_fails() {
        assert!(decompress(&[]).is_err());
    }
}
