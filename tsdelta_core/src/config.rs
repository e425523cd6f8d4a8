//! Codec-wide and per-column settings.

use serde::{Deserialize, Serialize};

use crate::flags::{CompressionLevel, Monotonicity};
use crate::format::MAX_BLOCKS;

/// Settings that apply to every frame a codec produces or reads.
///
/// Deserializes from JSON (or any serde format) with every field optional:
///
/// ```json
/// { "max_parallel": 16, "num_threads": 4 }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecConfig {
    /// Ceiling for the block count of a frame. Defaults to four blocks per
    /// available core. Always clamped into `1..=255`.
    #[serde(default)]
    pub max_parallel: Option<usize>,
    /// Size of a dedicated worker pool. When unset the global rayon pool is used.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl CodecConfig {
    /// Effective block-count ceiling.
    pub fn max_parallel(&self) -> usize {
        let requested = self.max_parallel.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .saturating_mul(4)
        });
        requested.clamp(1, MAX_BLOCKS)
    }
}

/// Encoding options for one column.
///
/// ```
/// use tsdelta_core::{ColumnOptions, CompressionLevel, Monotonicity};
///
/// let opts = ColumnOptions::new()
///     .level(CompressionLevel::Optimal)
///     .granularity(25i64)
///     .monotonicity(Monotonicity::NonDecreasing);
/// assert_eq!(opts.granularity, Some(25));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnOptions<T> {
    pub level: CompressionLevel,
    /// Expected spacing between values. Ignored when it does not divide the data.
    pub granularity: Option<T>,
    /// Ordering hint. Ignored when the data does not honor it.
    pub monotonicity: Monotonicity,
}

impl<T> Default for ColumnOptions<T> {
    fn default() -> Self {
        Self {
            level: CompressionLevel::default(),
            granularity: None,
            monotonicity: Monotonicity::default(),
        }
    }
}

impl<T> ColumnOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    pub fn granularity(mut self, granularity: T) -> Self {
        self.granularity = Some(granularity);
        self
    }

    pub fn monotonicity(mut self, monotonicity: Monotonicity) -> Self {
        self.monotonicity = monotonicity;
        self
    }
}
