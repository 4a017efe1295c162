//! Register image files for the simulated console.
//!
//! Lets a dry run start from the readback of a particular console instead of
//! the stock values, and keeps the result of a simulated commit around for
//! inspection. Operator settings are never stored here.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "XBRG"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Revision marker  |  u8 (0 = two-register layout)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RegDumpError;

/// Magic bytes identifying a register image file.
const MAGIC: &[u8; 4] = b"XBRG";
/// Current register image format version.
const FORMAT_VERSION: u32 = 1;
/// Only the north-bridge + graphics-core layout pair is known.
const REVISION_TWO_PLL: u8 = 0;
const HEADER_LEN: usize = 9;

/// Raw contents of both PLL registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterImage {
    pub nb_pll: u32,
    pub gpu_pll: u32,
}

pub fn encode_image(image: &RegisterImage) -> Result<Vec<u8>, RegDumpError> {
    let payload = bincode::serialize(image)?;
    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(REVISION_TWO_PLL);
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn decode_image(data: &[u8]) -> Result<RegisterImage, RegDumpError> {
    if data.len() < HEADER_LEN {
        return Err(RegDumpError::TooSmall(data.len()));
    }
    if &data[0..4] != MAGIC {
        return Err(RegDumpError::BadMagic);
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(RegDumpError::Version { found: version, expected: FORMAT_VERSION });
    }
    if data[8] != REVISION_TWO_PLL {
        return Err(RegDumpError::Revision(data[8]));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| RegDumpError::Decompress(format!("{:?}", e)))?;
    Ok(bincode::deserialize(&decompressed)?)
}

/// Save an image with header and deflate compression.
pub fn save_to_file(image: &RegisterImage, path: &Path) -> Result<(), RegDumpError> {
    std::fs::write(path, encode_image(image)?)?;
    Ok(())
}

/// Load an image, verifying magic, version and revision.
pub fn load_from_file(path: &Path) -> Result<RegisterImage, RegDumpError> {
    let data = std::fs::read(path)?;
    decode_image(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: RegisterImage = RegisterImage { nb_pll: 0x5A23_0801, gpu_pll: 0x0001_1C01 };

    #[test]
    fn test_header_layout() {
        let bytes = encode_image(&IMAGE).unwrap();
        assert_eq!(&bytes[0..4], b"XBRG");
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(bytes[8], 0);
        assert_eq!(decode_image(&bytes).unwrap(), IMAGE);
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert!(matches!(decode_image(b"XBR"), Err(RegDumpError::TooSmall(3))));

        let mut bytes = encode_image(&IMAGE).unwrap();
        bytes[0] = b'Y';
        assert!(matches!(decode_image(&bytes), Err(RegDumpError::BadMagic)));

        let mut bytes = encode_image(&IMAGE).unwrap();
        bytes[4] = 9;
        assert!(matches!(decode_image(&bytes), Err(RegDumpError::Version { found: 9, expected: 1 })));

        let mut bytes = encode_image(&IMAGE).unwrap();
        bytes[8] = 3;
        assert!(matches!(decode_image(&bytes), Err(RegDumpError::Revision(3))));
    }

    #[test]
    fn test_corrupt_payload() {
        let mut bytes = encode_image(&IMAGE).unwrap();
        bytes.truncate(HEADER_LEN + 1);
        assert!(decode_image(&bytes).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("clocktune-regdump-{}.xbrg", std::process::id()));
        save_to_file(&IMAGE, &path).unwrap();
        let loaded = load_from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.unwrap(), IMAGE);
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("clocktune-regdump-does-not-exist.xbrg");
        assert!(matches!(load_from_file(&path), Err(RegDumpError::Io(_))));
    }
}
