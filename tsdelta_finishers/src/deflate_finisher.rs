use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use tsdelta_core::{CompressionLevel, Finisher};

use crate::FINISHER_DEFLATE;

/// Raw DEFLATE (RFC 1951) finisher, without zlib or gzip framing.
///
/// `Fastest` maps to deflate level 1 and `Optimal` to level 9. This is the
/// finisher behind [`default_codec`](crate::default_codec).
pub struct DeflateFinisher;

impl DeflateFinisher {
    fn compression(level: CompressionLevel) -> Compression {
        match level {
            CompressionLevel::Optimal => Compression::best(),
            CompressionLevel::Fastest | CompressionLevel::NoCompression => Compression::fast(),
        }
    }
}

impl Finisher for DeflateFinisher {
    fn id(&self) -> u16 {
        FINISHER_DEFLATE
    }

    fn name(&self) -> &'static str {
        "deflate"
    }

    fn encode(&self, raw: &[u8], level: CompressionLevel) -> anyhow::Result<Vec<u8>> {
        let mut enc = DeflateEncoder::new(Vec::with_capacity(raw.len() / 2), Self::compression(level));
        enc.write_all(raw)?;
        Ok(enc.finish()?)
    }

    fn decode(&self, compressed: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut raw = Vec::with_capacity(compressed.len() * 2);
        DeflateDecoder::new(compressed)
            .read_to_end(&mut raw)
            .map_err(|e| anyhow::anyhow!("deflate decompress error: {}", e))?;
        Ok(raw)
    }
}
