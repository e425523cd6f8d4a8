//! Lossless delta codec for numeric and temporal time series.
//!
//! Values are split into blocks. Each block stores its first value (the
//! anchor), the common factor of its successive differences, and the
//! differences divided by that factor packed into the fewest bytes that hold
//! them. A pluggable [`Finisher`] then compresses every block payload, and the
//! blocks of one or more columns are assembled into a self-describing frame.
//!
//! ```
//! use std::sync::Arc;
//! use tsdelta_core::{ColumnOptions, CompressionLevel, DeltaCodec, Finisher};
//!
//! struct Identity;
//!
//! impl Finisher for Identity {
//!     fn id(&self) -> u16 { 0 }
//!     fn name(&self) -> &'static str { "identity" }
//!     fn encode(&self, raw: &[u8], _: CompressionLevel) -> anyhow::Result<Vec<u8>> { Ok(raw.to_vec()) }
//!     fn decode(&self, data: &[u8]) -> anyhow::Result<Vec<u8>> { Ok(data.to_vec()) }
//! }
//!
//! let codec = DeltaCodec::new(Arc::new(Identity));
//! let values: Vec<i64> = (0..1000).map(|i| 230_000 + 25 * i).collect();
//! let frame = codec.encode(&values, 4, &ColumnOptions::new()).unwrap();
//! assert_eq!(codec.decode::<i64>(&frame).unwrap(), values);
//! ```

pub mod block;
pub mod codec;
pub mod config;
pub mod delta;
pub mod error;
pub mod factor;
pub mod finisher;
pub mod flags;
pub mod format;
mod pack;
pub mod range;
pub mod reader;
pub mod struple;
pub mod types;
pub mod writer;

pub use block::BlockState;
pub use codec::DeltaCodec;
pub use config::{CodecConfig, ColumnOptions};
pub use delta::DeltaValue;
pub use error::{DeltaError, Result};
pub use finisher::Finisher;
pub use flags::{BlockFlags, CompressionLevel, Monotonicity};
pub use format::{magic_number, FrameHeader, FORMAT_VERSION, FRAME_HEADER_SIZE, MAX_BLOCKS};
pub use range::Range;
pub use reader::{CellInfo, FrameInfo, FrameReader};
pub use struple::Struple;
pub use types::{DataType, Decimal, Duration, Instant, OffsetInstant};
pub use writer::FrameWriter;
