use xxhash_rust::xxh3::xxh3_64;

use crate::error::{DeltaError, Result};

/// Version of the frame and block layouts; part of the codec identity.
pub const FORMAT_VERSION: u16 = 1;

/// Fixed size of the frame header in bytes.
///   magic:i32 + num_blocks:u8 + num_vectors:u8 + flags:u16 = 8
pub const FRAME_HEADER_SIZE: usize = 8;

/// Size of the length prefix in front of every cell.
pub const CELL_PREFIX_SIZE: usize = 4;

/// Upper bound on blocks per frame (the count is stored in one byte).
pub const MAX_BLOCKS: usize = 255;

/// Upper bound on vectors per frame (the count is stored in one byte).
pub const MAX_VECTORS: usize = 255;

/// Identity hash of a codec built around the finisher called `finisher_name`.
///
/// Stable across runs and builds: the low 32 bits of xxh3-64 over
/// `"tsdelta/<version>/<finisher>"`.
pub fn magic_number(finisher_name: &str) -> i32 {
    let identity = format!("tsdelta/{}/{}", FORMAT_VERSION, finisher_name);
    xxh3_64(identity.as_bytes()) as u32 as i32
}

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: i32,
    pub num_blocks: u8,
    pub num_vectors: u8,
    /// Reserved; always zero.
    pub flags: u16,
}

impl FrameHeader {
    /// Serialize to exactly `FRAME_HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4] = self.num_blocks;
        buf[5] = self.num_vectors;
        buf[6..8].copy_from_slice(&self.flags.to_le_bytes());
        buf
    }

    /// Deserialize from `FRAME_HEADER_SIZE` bytes, checking the magic.
    pub fn from_bytes(buf: &[u8; FRAME_HEADER_SIZE], expected_magic: i32) -> Result<Self> {
        let header = Self {
            magic: i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            num_blocks: buf[4],
            num_vectors: buf[5],
            flags: u16::from_le_bytes([buf[6], buf[7]]),
        };
        if header.magic != expected_magic {
            return Err(DeltaError::MagicMismatch {
                expected: expected_magic,
                found: header.magic,
            });
        }
        if header.flags != 0 {
            return Err(DeltaError::InvalidFormat(format!(
                "reserved frame flags {:#06x} are set",
                header.flags
            )));
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = FrameHeader {
            magic: magic_number("deflate"),
            num_blocks: 8,
            num_vectors: 5,
            flags: 0,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes[4], 8);
        assert_eq!(bytes[5], 5);
        assert_eq!(FrameHeader::from_bytes(&bytes, header.magic).unwrap(), header);
    }

    #[test]
    fn test_magic_depends_on_finisher_and_is_stable() {
        assert_eq!(magic_number("deflate"), magic_number("deflate"));
        assert_ne!(magic_number("deflate"), magic_number("lz4"));
    }

    #[test]
    fn test_wrong_magic_is_rejected() {
        let header = FrameHeader {
            magic: magic_number("zstd"),
            num_blocks: 1,
            num_vectors: 1,
            flags: 0,
        };
        let err = FrameHeader::from_bytes(&header.to_bytes(), magic_number("deflate")).unwrap_err();
        assert!(matches!(err, DeltaError::MagicMismatch { .. }));
        assert!(err.to_string().contains("wrong codec"));
    }
}
