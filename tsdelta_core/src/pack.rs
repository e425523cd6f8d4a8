//! Byte-level helpers shared by the delta transform and the serializers:
//! a bounds-checked read cursor, zig-zag sign folding, fixed-width residual
//! packing, and LEB128 varints for small side values.

use crate::error::{DeltaError, Result};

// ── Read cursor ────────────────────────────────────────────────────────────

/// Forward-only reader over a byte slice. Every read is bounds-checked and
/// reports what it was reading when the input runs out.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(DeltaError::Truncated {
                context,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, context)?);
        Ok(out)
    }

    pub fn u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.array::<1>(context)?[0])
    }

    pub fn u16(&mut self, context: &'static str) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array(context)?))
    }

    pub fn i32(&mut self, context: &'static str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array(context)?))
    }

    /// Fail if anything is left unread.
    pub fn expect_end(&self, context: &'static str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(DeltaError::InvalidFormat(format!(
                "{} trailing bytes after {}",
                self.remaining(),
                context
            )));
        }
        Ok(())
    }
}

// ── Zig-zag ────────────────────────────────────────────────────────────────

#[inline]
pub(crate) fn zigzag(v: i128) -> u128 {
    ((v << 1) ^ (v >> 127)) as u128
}

#[inline]
pub(crate) fn unzigzag(u: u128) -> i128 {
    ((u >> 1) as i128) ^ -((u & 1) as i128)
}

// ── Fixed-width residual packing ───────────────────────────────────────────

/// Smallest number of bytes that holds `max`; zero for `max == 0`.
#[inline]
pub(crate) fn byte_width(max: u128) -> u8 {
    ((128 - max.leading_zeros() + 7) / 8) as u8
}

/// Write `[width:u8][value:width bytes LE]*`, where `width` fits the largest value.
///
/// `values` is walked twice, once for the width and once to write.
pub(crate) fn write_packed<I>(values: I, out: &mut Vec<u8>)
where
    I: Iterator<Item = u128> + Clone,
{
    let width = byte_width(values.clone().max().unwrap_or(0));
    out.push(width);
    let w = width as usize;
    if w == 0 {
        return;
    }
    out.reserve(values.size_hint().0 * w);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes()[..w]);
    }
}

/// Lazily unpacked residuals of one packed stream.
pub(crate) struct Packed<'a> {
    bytes: &'a [u8],
    width: usize,
    remaining: usize,
}

impl Iterator for Packed<'_> {
    type Item = u128;

    fn next(&mut self) -> Option<u128> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if self.width == 0 {
            return Some(0);
        }
        let (chunk, rest) = self.bytes.split_at(self.width);
        self.bytes = rest;
        let mut le = [0u8; 16];
        le[..self.width].copy_from_slice(chunk);
        Some(u128::from_le_bytes(le))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Packed<'_> {}

/// Consume a packed stream of `count` residuals from `reader`.
///
/// The bytes are bounds-checked up front; values are decoded on iteration.
pub(crate) fn read_packed<'a>(reader: &mut ByteReader<'a>, count: usize) -> Result<Packed<'a>> {
    let width = reader.u8("residual width")? as usize;
    if width > 16 {
        return Err(DeltaError::InvalidFormat(format!(
            "residual width {} exceeds 16 bytes",
            width
        )));
    }
    let total = count.checked_mul(width).ok_or_else(|| {
        DeltaError::InvalidFormat(format!("{} residuals of {} bytes overflow", count, width))
    })?;
    let bytes = reader.take(total, "packed residuals")?;
    Ok(Packed {
        bytes,
        width,
        remaining: count,
    })
}

// ── LEB128 varints ─────────────────────────────────────────────────────────

pub(crate) fn write_varint(mut value: u128, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub(crate) fn read_varint(reader: &mut ByteReader<'_>) -> Result<u128> {
    let mut result: u128 = 0;
    let mut shift = 0u32;
    loop {
        let byte = reader.u8("varint")?;
        let payload = (byte & 0x7F) as u128;
        if shift >= 128 || (shift > 121 && payload >> (128 - shift) != 0) {
            return Err(DeltaError::InvalidFormat("varint overflows 128 bits".to_string()));
        }
        result |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}
