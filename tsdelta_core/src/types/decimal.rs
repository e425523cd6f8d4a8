use std::fmt;
use std::str::FromStr;

use crate::error::{DeltaError, Result};

/// Exclusive bound on the mantissa magnitude (96 bits).
const MANTISSA_LIMIT: u128 = 1 << 96;

const SIGN_BIT: u32 = 1 << 31;
const SCALE_SHIFT: u32 = 16;

/// Fixed-point decimal: a signed 96-bit integer mantissa and a power-of-ten scale.
///
/// The value is `mantissa / 10^scale`. Equality is structural, so `1.0` and
/// `1.00` are different values; this is what makes round trips bit-exact.
///
/// Wire form (16 bytes, little-endian words):
/// ```text
/// lo:u32  mid:u32  hi:u32  flags:u32   flags = scale << 16 | sign << 31
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    pub const MAX_SCALE: u8 = 28;
    pub const ZERO: Decimal = Decimal { mantissa: 0, scale: 0 };
    pub const ONE: Decimal = Decimal { mantissa: 1, scale: 0 };

    pub fn new(mantissa: i128, scale: u8) -> Result<Self> {
        if scale > Self::MAX_SCALE {
            return Err(DeltaError::InvalidArgument(format!(
                "decimal scale {} exceeds {}",
                scale,
                Self::MAX_SCALE
            )));
        }
        if !Self::mantissa_fits(mantissa) {
            return Err(DeltaError::InvalidArgument(format!(
                "decimal mantissa {} does not fit in 96 bits",
                mantissa
            )));
        }
        Ok(Self { mantissa, scale })
    }

    #[inline]
    pub fn mantissa(self) -> i128 {
        self.mantissa
    }

    #[inline]
    pub fn scale(self) -> u8 {
        self.scale
    }

    #[inline]
    pub(crate) fn mantissa_fits(mantissa: i128) -> bool {
        mantissa.unsigned_abs() < MANTISSA_LIMIT
    }

    /// Mantissa expressed at a larger (or equal) `scale`, if it still fits in 96 bits.
    pub(crate) fn rescaled(self, scale: u8) -> Option<i128> {
        let shift = scale.checked_sub(self.scale)?;
        let m = self.mantissa.checked_mul(10i128.checked_pow(shift as u32)?)?;
        Self::mantissa_fits(m).then_some(m)
    }

    pub fn to_le_bytes(self) -> [u8; 16] {
        let magnitude = self.mantissa.unsigned_abs();
        let mut flags = (self.scale as u32) << SCALE_SHIFT;
        if self.mantissa < 0 {
            flags |= SIGN_BIT;
        }
        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&(magnitude as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&((magnitude >> 32) as u32).to_le_bytes());
        buf[8..12].copy_from_slice(&((magnitude >> 64) as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&flags.to_le_bytes());
        buf
    }

    /// Decode the 16-byte wire form. A negative zero decodes as zero.
    pub fn from_le_bytes(buf: [u8; 16]) -> Result<Self> {
        let word = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        let flags = word(12);
        if flags & !(SIGN_BIT | (0xFF << SCALE_SHIFT)) != 0 {
            return Err(DeltaError::InvalidFormat(format!(
                "decimal flags word {:#010x} has reserved bits set",
                flags
            )));
        }
        let scale = ((flags >> SCALE_SHIFT) & 0xFF) as u8;
        if scale > Self::MAX_SCALE {
            return Err(DeltaError::InvalidFormat(format!(
                "decimal scale {} exceeds {}",
                scale,
                Self::MAX_SCALE
            )));
        }
        let magnitude = word(0) as i128 | (word(4) as i128) << 32 | (word(8) as i128) << 64;
        let mantissa = if flags & SIGN_BIT != 0 { -magnitude } else { magnitude };
        Ok(Self { mantissa, scale })
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Self {
            mantissa: v as i128,
            scale: 0,
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl FromStr for Decimal {
    type Err = DeltaError;

    /// Parses plain decimal text such as `-12.500`; the scale is the number of
    /// fractional digits written.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DeltaError::InvalidArgument(format!("invalid decimal literal {:?}", s));
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > Self::MAX_SCALE as usize {
            return Err(invalid());
        }
        let mut mantissa: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10).ok_or_else(invalid)? as i128;
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(d))
                .ok_or_else(invalid)?;
        }
        if negative {
            mantissa = -mantissa;
        }
        Self::new(mantissa, frac_part.len() as u8)
    }
}
