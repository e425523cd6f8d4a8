use tsdelta_core::{CompressionLevel, Finisher};

use crate::FINISHER_PASSTHROUGH;

/// Identity finisher. Residual payloads reach the frame byte for byte, so a
/// `Fastest` or `Optimal` block costs the same as `NoCompression`.
///
/// Handy when looking at packed residuals in `inspect` output, and as the
/// baseline the compressing finishers are measured against.
pub struct PassThroughFinisher;

impl Finisher for PassThroughFinisher {
    fn id(&self) -> u16 {
        FINISHER_PASSTHROUGH
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn encode(&self, raw: &[u8], _level: CompressionLevel) -> anyhow::Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decode(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}
