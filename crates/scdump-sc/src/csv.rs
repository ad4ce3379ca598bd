use anyhow::Context;

use crate::compression;

pub const SIGNATURE_MAGIC: &[u8; 4] = b"Sig:";
/// Magic plus the signature blob that precedes the real data.
pub const SIGNATURE_LEN: usize = 68;

pub fn is_signed(bytes: &[u8]) -> bool {
    bytes.starts_with(SIGNATURE_MAGIC)
}

/// Drops the `Sig:` block from the front of `bytes`, if there is one.
pub fn strip_signature(bytes: &[u8]) -> &[u8] {
    if is_signed(bytes) {
        bytes.get(SIGNATURE_LEN..).unwrap_or_default()
    } else {
        bytes
    }
}

/// Decompresses a compressed CSV table.
pub fn decode(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    compression::decompress(bytes).context("Failed to decompress CSV table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sc_lzma;

    #[test]
    fn strips_signature() {
        let mut signed = SIGNATURE_MAGIC.to_vec();
        signed.resize(SIGNATURE_LEN, 0xAA);
        signed.extend_from_slice(b"payload");

        assert_eq!(strip_signature(&signed), b"payload");
        assert_eq!(strip_signature(b"payload"), b"payload");
        assert!(strip_signature(b"Sig:short").is_empty());
    }

    #[test]
    fn decodes_table() {
        let table = b"\"Name\",\"Cost\"\n\"String\",\"int\"\n\"Arrows\",3\n";
        assert_eq!(decode(&sc_lzma(table)).unwrap(), table);
    }
}
