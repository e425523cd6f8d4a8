//! The 16-bit block descriptor.
//!
//! ```text
//! bit  0..=3   data type code
//! bit  4..=5   compression level   (0 none, 1 fastest, 2 optimal)
//! bit  6..=7   monotonicity        (0 none, 1 non-decreasing, 2 non-increasing)
//! bit  8       alias flag
//! bit  9..=11  reserved, always zero
//! bit 12..=15  alias data type code
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DeltaError, Result};
use crate::types::DataType;

const TYPE_MASK: u16 = 0x000F;
const LEVEL_SHIFT: u16 = 4;
const MONO_SHIFT: u16 = 6;
const ALIAS_BIT: u16 = 1 << 8;
const RESERVED_MASK: u16 = 0x0E00;
const ALIAS_TYPE_SHIFT: u16 = 12;

/// How hard the finisher should work on a block payload.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CompressionLevel {
    /// The payload is stored as produced by the delta transform.
    NoCompression = 0,
    #[default]
    Fastest = 1,
    Optimal = 2,
}

impl TryFrom<u8> for CompressionLevel {
    type Error = DeltaError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(CompressionLevel::NoCompression),
            1 => Ok(CompressionLevel::Fastest),
            2 => Ok(CompressionLevel::Optimal),
            other => Err(DeltaError::InvalidFormat(format!(
                "unknown compression level {}",
                other
            ))),
        }
    }
}

/// Ordering hint for a column. Monotone blocks pack their residuals without a sign.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Monotonicity {
    #[default]
    None = 0,
    NonDecreasing = 1,
    NonIncreasing = 2,
}

impl TryFrom<u8> for Monotonicity {
    type Error = DeltaError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Monotonicity::None),
            1 => Ok(Monotonicity::NonDecreasing),
            2 => Ok(Monotonicity::NonIncreasing),
            other => Err(DeltaError::InvalidFormat(format!(
                "unknown monotonicity {}",
                other
            ))),
        }
    }
}

/// Unpacked form of the block descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFlags {
    pub data_type: DataType,
    pub level: CompressionLevel,
    pub monotonicity: Monotonicity,
    /// Set when the block was encoded through an integer stand-in type.
    pub alias: Option<DataType>,
}

impl BlockFlags {
    pub fn new(data_type: DataType, level: CompressionLevel, monotonicity: Monotonicity) -> Self {
        Self {
            data_type,
            level,
            monotonicity,
            alias: None,
        }
    }

    pub fn pack(&self) -> u16 {
        let mut bits = self.data_type.code() as u16 & TYPE_MASK;
        bits |= (self.level as u16) << LEVEL_SHIFT;
        bits |= (self.monotonicity as u16) << MONO_SHIFT;
        if let Some(alias) = self.alias {
            bits |= ALIAS_BIT;
            bits |= (alias.code() as u16) << ALIAS_TYPE_SHIFT;
        }
        bits
    }

    pub fn unpack(bits: u16) -> Result<Self> {
        if bits & RESERVED_MASK != 0 {
            return Err(DeltaError::InvalidFormat(format!(
                "block flags {:#06x} have reserved bits set",
                bits
            )));
        }
        let data_type = DataType::try_from((bits & TYPE_MASK) as u8)?;
        let level = CompressionLevel::try_from(((bits >> LEVEL_SHIFT) & 0b11) as u8)?;
        let monotonicity = Monotonicity::try_from(((bits >> MONO_SHIFT) & 0b11) as u8)?;
        let alias_code = (bits >> ALIAS_TYPE_SHIFT) as u8;
        let alias = if bits & ALIAS_BIT != 0 {
            Some(DataType::try_from(alias_code)?)
        } else if alias_code != 0 {
            return Err(DeltaError::InvalidFormat(format!(
                "block flags {:#06x} carry an alias type without the alias bit",
                bits
            )));
        } else {
            None
        };
        Ok(Self {
            data_type,
            level,
            monotonicity,
            alias,
        })
    }
}
