pub mod chunk;
pub mod compression;
pub mod csv;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

use std::io::Cursor;

use anyhow::{ensure, Context};
use binrw::{binread, BinReaderExt};
use chunk::ChunkReader;
use tracing::debug;

pub const SC_MAGIC: &[u8; 2] = b"SC";

#[binread]
#[br(big)]
#[derive(Debug, Clone)]
pub struct ScHeader {
    #[br(temp, assert(&magic == SC_MAGIC, "Missing SC magic"))]
    magic: [u8; 2],
    pub major_version: u32,
    pub minor_version: u32,
    #[br(temp)]
    hash_len: u32,
    /// MD5 of the decompressed data
    #[br(count = hash_len as usize)]
    pub hash: Vec<u8>,
}

/// A decompressed `.sc` container.
#[derive(Debug)]
pub struct ScFile {
    pub header: ScHeader,
    pub data: Vec<u8>,
    pub hash_matches: bool,
}

impl ScFile {
    pub fn parse(bytes: &[u8]) -> anyhow::Result<Self> {
        let mut c = Cursor::new(bytes);
        let header: ScHeader = c.read_be().context("Failed to read SC header")?;
        debug!(
            "sc file version: {}.{}",
            header.major_version, header.minor_version
        );
        debug!("md5 hash: {}", hex::encode(&header.hash));

        let payload = &bytes[c.position() as usize..];
        let data = compression::decompress(payload).context("Failed to decompress SC payload")?;

        let hash_matches = md5::compute(&data).0[..] == header.hash[..];
        if !hash_matches {
            debug!("File seems corrupted");
        }

        Ok(Self {
            header,
            data,
            hash_matches,
        })
    }

    /// Iterates the chunk stream. `legacy` skips the preamble found in `*_dl.sc` files.
    pub fn chunks(&self, legacy: bool) -> anyhow::Result<ChunkReader<'_>> {
        let start = if legacy {
            legacy_preamble_len(&self.data).context("Failed to skip legacy preamble")?
        } else {
            0
        };

        Ok(ChunkReader::new(&self.data[start..]))
    }
}

/// Length of the legacy preamble: 17 bytes, a u16 count, `count` u16 ids and `count` short strings.
fn legacy_preamble_len(data: &[u8]) -> anyhow::Result<usize> {
    let mut offset = 17;
    ensure!(data.len() >= offset + 2, "Data ends inside the legacy header");
    let count = u16::from_le_bytes([data[offset], data[offset + 1]]) as usize;
    offset += 2 + count * 2;

    for i in 0..count {
        let len = *data
            .get(offset)
            .with_context(|| format!("Data ends before legacy string {i}"))?
            as usize;
        offset += 1 + len;
    }

    ensure!(offset <= data.len(), "Legacy strings run past the end of the data");
    Ok(offset)
}
