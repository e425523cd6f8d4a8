use tsdelta_core::{CompressionLevel, Finisher};

use crate::FINISHER_ZSTD;

/// Zstandard block finisher.
///
/// Each payload is compressed independently, so any block can be expanded
/// without touching its neighbours.
///
/// Best for: cold data where size matters more than encode time.
pub struct ZstdFinisher {
    /// zstd level used for `CompressionLevel::Fastest`.
    pub fast_level: i32,
    /// zstd level used for `CompressionLevel::Optimal`.
    pub optimal_level: i32,
}

impl Default for ZstdFinisher {
    fn default() -> Self {
        Self {
            fast_level: 1,
            optimal_level: 19,
        }
    }
}

impl ZstdFinisher {
    pub fn new(fast_level: i32, optimal_level: i32) -> Self {
        Self {
            fast_level,
            optimal_level,
        }
    }
}

impl Finisher for ZstdFinisher {
    fn id(&self) -> u16 {
        FINISHER_ZSTD
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn encode(&self, raw: &[u8], level: CompressionLevel) -> anyhow::Result<Vec<u8>> {
        let level = match level {
            CompressionLevel::Optimal => self.optimal_level,
            CompressionLevel::Fastest | CompressionLevel::NoCompression => self.fast_level,
        };
        let compressed = zstd::bulk::compress(raw, level)?;
        Ok(compressed)
    }

    fn decode(&self, compressed: &[u8]) -> anyhow::Result<Vec<u8>> {
        // The zstd frame carries its own content size.
        let raw = zstd::decode_all(compressed)?;
        Ok(raw)
    }
}
