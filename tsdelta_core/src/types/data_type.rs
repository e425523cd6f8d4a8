use serde::{Deserialize, Serialize};

use crate::error::DeltaError;

/// The closed set of primitive element types a block can carry.
///
/// The discriminant is the 4-bit numeric code written into block flags, so the
/// values are part of the wire format and must never be renumbered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DataType {
    Bool = 0,
    Byte = 1,
    SByte = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int64 = 7,
    UInt64 = 8,
    Float32 = 9,
    Float64 = 10,
    Decimal = 11,
    Instant = 12,
    Duration = 13,
    #[serde(rename = "offset_instant")]
    OffsetInstant = 14,
}

impl DataType {
    /// Numeric code stored in bits 0..=3 (and 12..=15 for aliases) of the block flags.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Fixed width of one value in bytes.
    pub fn width(self) -> usize {
        match self {
            DataType::Bool | DataType::Byte | DataType::SByte => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::Instant
            | DataType::Duration => 8,
            DataType::OffsetInstant => 10,
            DataType::Decimal => 16,
        }
    }

    /// Width of the `factor` field in a serialized block.
    ///
    /// Equal to [`width`](Self::width) for every type except offset-instant,
    /// whose factor is a plain tick count without a zone offset.
    pub fn factor_width(self) -> usize {
        match self {
            DataType::OffsetInstant => 8,
            other => other.width(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Byte => "byte",
            DataType::SByte => "sbyte",
            DataType::Int16 => "int16",
            DataType::UInt16 => "uint16",
            DataType::Int32 => "int32",
            DataType::UInt32 => "uint32",
            DataType::Int64 => "int64",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Decimal => "decimal",
            DataType::Instant => "instant",
            DataType::Duration => "duration",
            DataType::OffsetInstant => "offset_instant",
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = DeltaError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => DataType::Bool,
            1 => DataType::Byte,
            2 => DataType::SByte,
            3 => DataType::Int16,
            4 => DataType::UInt16,
            5 => DataType::Int32,
            6 => DataType::UInt32,
            7 => DataType::Int64,
            8 => DataType::UInt64,
            9 => DataType::Float32,
            10 => DataType::Float64,
            11 => DataType::Decimal,
            12 => DataType::Instant,
            13 => DataType::Duration,
            14 => DataType::OffsetInstant,
            other => {
                return Err(DeltaError::InvalidFormat(format!(
                    "unknown data type code {}",
                    other
                )))
            }
        })
    }
}
