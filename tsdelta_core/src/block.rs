//! Per-block envelope and its fixed binary layout.
//!
//! ```text
//! flags       : u16   (see `flags`)
//! list_count  : i32
//! anchor      : type width bytes   (offset-instant: 8 tick bytes + i16 zone offset)
//! factor      : factor width bytes
//! byte_count  : i32
//! payload     : byte_count bytes
//! ```
//! All integers are little-endian.

use crate::delta::DeltaValue;
use crate::error::{DeltaError, Result};
use crate::flags::{BlockFlags, CompressionLevel, Monotonicity};
use crate::pack::ByteReader;

/// Size of the fixed part of a block around the anchor and factor fields.
pub const BLOCK_FIXED_SIZE: usize = 2 + 4 + 4;

/// One independently encodable run of values from a single column.
///
/// Encoding fills `anchor`, `factor`, `list_count` and `bytes` from `list`;
/// decoding goes the other way.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockState<T> {
    pub flags: BlockFlags,
    pub list_count: usize,
    pub anchor: T,
    pub factor: T,
    pub list: Vec<T>,
    pub bytes: Vec<u8>,
}

impl<T: DeltaValue> BlockState<T> {
    pub fn new(list: Vec<T>, level: CompressionLevel, monotonicity: Monotonicity) -> Self {
        Self {
            flags: BlockFlags::new(T::DATA_TYPE, level, monotonicity),
            list_count: list.len(),
            anchor: T::ZERO,
            factor: T::ONE,
            list,
            bytes: Vec::new(),
        }
    }

    /// Run the delta transform over `list`, producing `bytes`.
    pub fn encode(&mut self, granularity: Option<T>) -> Result<()> {
        T::encode_block(self, granularity)
    }

    /// Inverse of [`encode`](Self::encode), producing `list`.
    pub fn decode(&mut self) -> Result<()> {
        T::decode_block(self)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        let list_count = i32::try_from(self.list_count).map_err(|_| {
            DeltaError::InvalidArgument(format!(
                "block of {} values exceeds the i32 element count",
                self.list_count
            ))
        })?;
        let byte_count = i32::try_from(self.bytes.len()).map_err(|_| {
            DeltaError::InvalidArgument(format!(
                "block payload of {} bytes exceeds the i32 byte count",
                self.bytes.len()
            ))
        })?;

        let data_type = T::DATA_TYPE;
        let mut out = Vec::with_capacity(
            BLOCK_FIXED_SIZE + data_type.width() + data_type.factor_width() + self.bytes.len(),
        );
        out.extend_from_slice(&self.flags.pack().to_le_bytes());
        out.extend_from_slice(&list_count.to_le_bytes());
        self.anchor.write_anchor(&mut out);
        self.factor.write_factor(&mut out);
        out.extend_from_slice(&byte_count.to_le_bytes());
        out.extend_from_slice(&self.bytes);
        Ok(out)
    }

    /// Parse a serialized block. The value list is left empty until [`decode`](Self::decode).
    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(buf);
        let flags = BlockFlags::unpack(reader.u16("block flags")?)?;
        if flags.data_type != T::DATA_TYPE {
            return Err(DeltaError::TypeMismatch {
                expected: T::DATA_TYPE,
                found: flags.data_type,
            });
        }
        let list_count = reader.i32("block list count")?;
        let list_count = usize::try_from(list_count).map_err(|_| {
            DeltaError::InvalidFormat(format!("negative block list count {}", list_count))
        })?;
        let anchor = T::read_anchor(reader.take(T::DATA_TYPE.width(), "block anchor")?)?;
        let factor = T::read_factor(reader.take(T::DATA_TYPE.factor_width(), "block factor")?)?;
        let byte_count = reader.i32("block byte count")?;
        let byte_count = usize::try_from(byte_count).map_err(|_| {
            DeltaError::InvalidFormat(format!("negative block byte count {}", byte_count))
        })?;
        let bytes = reader.take(byte_count, "block payload")?.to_vec();
        reader.expect_end("block")?;
        Ok(Self {
            flags,
            list_count,
            anchor,
            factor,
            list: Vec::new(),
            bytes,
        })
    }
}
