use anyhow::Context;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use tsdelta_core::{CompressionLevel, Finisher};

use crate::FINISHER_LZ4;

/// Residual payloads as LZ4 blocks with a 4-byte uncompressed-size prefix.
///
/// The cheapest finisher to decode. lz4_flex exposes no levels, so
/// `Fastest` and `Optimal` write identical bytes.
pub struct Lz4Finisher;

impl Finisher for Lz4Finisher {
    fn id(&self) -> u16 {
        FINISHER_LZ4
    }

    fn name(&self) -> &'static str {
        "lz4"
    }

    fn encode(&self, raw: &[u8], _level: CompressionLevel) -> anyhow::Result<Vec<u8>> {
        Ok(compress_prepend_size(raw))
    }

    fn decode(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        decompress_size_prepended(data)
            .with_context(|| format!("corrupt lz4 residual payload ({} bytes)", data.len()))
    }
}
