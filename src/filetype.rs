use anyhow::bail;
use scdump_sc::{csv, SC_MAGIC};

/// LZMA properties byte Supercell's CSV tables are compressed with.
const CSV_LZMA_PROPERTIES: u8 = 0x5D;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FileType {
    /// Compressed CSV table
    Csv,
    /// `.sc` container
    Sc,
    /// Signature-prefixed file, the inner data needs to be detected again
    Signed,
}

impl FileType {
    pub fn detect(data: &[u8]) -> anyhow::Result<Self> {
        if data.first() == Some(&CSV_LZMA_PROPERTIES) {
            return Ok(Self::Csv);
        }

        if data.starts_with(SC_MAGIC) {
            return Ok(Self::Sc);
        }

        if csv::is_signed(data) {
            return Ok(Self::Signed);
        }

        bail!("Unknown header")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_headers() {
        assert_eq!(FileType::detect(&[0x5D, 0, 0]).unwrap(), FileType::Csv);
        assert_eq!(FileType::detect(b"SC\0\0\0\x01").unwrap(), FileType::Sc);
        assert_eq!(FileType::detect(b"Sig:....").unwrap(), FileType::Signed);
    }

    #[test]
    fn rejects_unknown_headers() {
        assert!(FileType::detect(b"PK\x03\x04").is_err());
        assert!(FileType::detect(&[]).is_err());
    }
}
