use crate::flags::CompressionLevel;

/// Secondary general-purpose byte compressor applied to each block payload.
///
/// Each `Finisher` implementation:
/// - Is identified by a stable numeric `id()` and a `name()`; the name feeds
///   the codec's magic number, so frames finished by one implementation are
///   rejected by a codec built around another.
/// - Works on one payload at a time with no state carried between calls. Blocks
///   are finished concurrently from many threads.
/// - Must make `decode(encode(x)) == x` for every level. `encode` output may
///   differ between levels or library versions; `decode` must not.
///
/// Payloads of blocks written with [`CompressionLevel::NoCompression`] never
/// reach the finisher.
pub trait Finisher: Send + Sync {
    /// Stable finisher ID.
    fn id(&self) -> u16;

    /// Human-readable name; part of the codec identity.
    fn name(&self) -> &'static str;

    /// Compress a single block payload.
    fn encode(&self, raw: &[u8], level: CompressionLevel) -> anyhow::Result<Vec<u8>>;

    /// Expand a payload produced by [`encode`](Self::encode).
    fn decode(&self, compressed: &[u8]) -> anyhow::Result<Vec<u8>>;
}
