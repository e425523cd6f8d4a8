//! The delta transform: per-type encode/decode between a block's value list
//! and its residual payload.
//!
//! Every supported type is lifted onto an `i128` "lane" (integers directly,
//! floats through their bit pattern, `bool` as 0/1, time values as ticks,
//! decimals as mantissas at the block's scale). On that lane a block is:
//!
//! ```text
//! anchor = v[0]
//! d[i]   = v[i] - v[i-1]            i = 1..n
//! factor = common factor of d       (or a supplied granularity dividing every d)
//! q[i]   = d[i] / factor            packed sign-free when monotone, zig-zag otherwise
//! ```
//!
//! Decoding re-accumulates `anchor + sum(q * factor)` and narrows each lane
//! back to the value type, so the exact input bit patterns are reproduced.

use std::fmt::Debug;

use log::{debug, warn};

use crate::block::BlockState;
use crate::error::{DeltaError, Result};
use crate::factor::common_factor;
use crate::flags::Monotonicity;
use crate::pack::{
    read_packed, read_varint, unzigzag, write_packed, write_varint, zigzag, ByteReader, Packed,
};
use crate::types::{DataType, Decimal, Duration, Instant, OffsetInstant};

/// A primitive value type the codec can carry.
///
/// Implemented for `bool`, the fixed-width integers up to 64 bits, `f32`,
/// `f64`, [`Decimal`], [`Instant`], [`Duration`] and [`OffsetInstant`].
pub trait DeltaValue: Copy + PartialEq + Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;
    /// Anchor of an empty block.
    const ZERO: Self;
    /// Factor of an empty or degenerate block.
    const ONE: Self;

    fn write_anchor(&self, out: &mut Vec<u8>);

    /// `bytes` is exactly `DATA_TYPE.width()` long.
    fn read_anchor(bytes: &[u8]) -> Result<Self>;

    fn write_factor(&self, out: &mut Vec<u8>) {
        self.write_anchor(out)
    }

    /// `bytes` is exactly `DATA_TYPE.factor_width()` long.
    fn read_factor(bytes: &[u8]) -> Result<Self> {
        Self::read_anchor(bytes)
    }

    /// Largest value dividing every element's underlying integer representation.
    /// Empty and all-zero inputs yield [`ONE`](Self::ONE).
    fn factor(values: &[Self]) -> Self;

    /// Fill `anchor`, `factor`, `list_count` and `bytes` from `list`.
    ///
    /// `state.flags.monotonicity` carries the caller's hint on entry and the
    /// monotonicity actually used on return.
    fn encode_block(state: &mut BlockState<Self>, granularity: Option<Self>) -> Result<()>;

    /// Rebuild `list` from `anchor`, `factor`, `list_count` and `bytes`.
    fn decode_block(state: &mut BlockState<Self>) -> Result<()>;
}

// ── Lane engine ────────────────────────────────────────────────────────────

/// Lossless mapping between a value and its integer lane.
trait Lane: Copy {
    fn to_lane(self) -> i128;
    /// `None` when the lane value is outside the type's range.
    fn from_lane(lane: i128) -> Option<Self>;
}

struct LaneEncoding {
    factor: i128,
    monotonicity: Monotonicity,
}

/// Successive differences `v[i] - v[i-1]` of a lane stream.
fn differences<I>(mut lanes: I) -> impl Iterator<Item = i128> + Clone
where
    I: Iterator<Item = i128> + Clone,
{
    let first = lanes.next().unwrap_or(0);
    lanes.scan(first, |previous, lane| {
        let d = lane - *previous;
        *previous = lane;
        Some(d)
    })
}

fn effective_monotonicity(mut diffs: impl Iterator<Item = i128>, hint: Monotonicity) -> Monotonicity {
    let holds = match hint {
        Monotonicity::None => true,
        Monotonicity::NonDecreasing => diffs.all(|d| d >= 0),
        Monotonicity::NonIncreasing => diffs.all(|d| d <= 0),
    };
    if holds {
        hint
    } else {
        debug!("{:?} hint does not hold for this block; packing residuals with sign", hint);
        Monotonicity::None
    }
}

fn choose_factor<I>(diffs: I, granularity: Option<i128>, fits: impl Fn(i128) -> bool) -> i128
where
    I: Iterator<Item = i128> + Clone,
{
    if let Some(g) = granularity.map(i128::abs).filter(|&g| g > 0) {
        if fits(g) && diffs.clone().all(|d| d % g == 0) {
            return g;
        }
        warn!("granularity {} does not divide every difference; using the computed factor", g);
    }
    let computed = common_factor(diffs.map(i128::unsigned_abs));
    match i128::try_from(computed) {
        Ok(f) if fits(f) => f,
        _ => {
            debug!("common factor {} is not representable in the value type; using 1", computed);
            1
        }
    }
}

/// Difference, factor and pack `lanes`, appending the packed quotients to `out`.
///
/// `lanes` is re-walked for each pass instead of being buffered.
fn encode_lanes<I>(
    lanes: I,
    granularity: Option<i128>,
    hint: Monotonicity,
    fits: impl Fn(i128) -> bool,
    out: &mut Vec<u8>,
) -> LaneEncoding
where
    I: Iterator<Item = i128> + Clone,
{
    let monotonicity = effective_monotonicity(differences(lanes.clone()), hint);
    let factor = choose_factor(differences(lanes.clone()), granularity, fits);
    let quotients = differences(lanes).map(move |d| {
        let q = d / factor;
        match monotonicity {
            Monotonicity::NonDecreasing => q as u128,
            Monotonicity::NonIncreasing => (-q) as u128,
            Monotonicity::None => zigzag(q),
        }
    });
    write_packed(quotients, out);
    LaneEncoding {
        factor,
        monotonicity,
    }
}

/// Inverse of [`encode_lanes`]: yields `count` lanes re-accumulated from `anchor`.
///
/// The first overflow is yielded as an error and ends the stream.
struct Lanes<'a> {
    current: i128,
    factor: i128,
    monotonicity: Monotonicity,
    remaining: usize,
    started: bool,
    residuals: Packed<'a>,
}

impl<'a> Lanes<'a> {
    fn read(
        anchor: i128,
        factor: i128,
        monotonicity: Monotonicity,
        count: usize,
        reader: &mut ByteReader<'a>,
    ) -> Result<Self> {
        if factor <= 0 {
            return Err(DeltaError::InvalidFormat(format!(
                "block factor {} is not positive",
                factor
            )));
        }
        let residuals = read_packed(reader, count.saturating_sub(1))?;
        Ok(Self {
            current: anchor,
            factor,
            monotonicity,
            remaining: count,
            started: false,
            residuals,
        })
    }

    fn step(&self, q: u128) -> Option<i128> {
        let step = match self.monotonicity {
            Monotonicity::NonDecreasing => i128::try_from(q).ok()?,
            Monotonicity::NonIncreasing => -i128::try_from(q).ok()?,
            Monotonicity::None => unzigzag(q),
        };
        step.checked_mul(self.factor)
            .and_then(|d| self.current.checked_add(d))
    }
}

impl Iterator for Lanes<'_> {
    type Item = Result<i128>;

    fn next(&mut self) -> Option<Result<i128>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if !self.started {
            self.started = true;
            return Some(Ok(self.current));
        }
        let next = self.residuals.next().and_then(|q| self.step(q));
        match next {
            Some(lane) => {
                self.current = lane;
                Some(Ok(lane))
            }
            None => {
                self.remaining = 0;
                Some(Err(DeltaError::InvalidFormat(
                    "residuals overflow the value range".to_string(),
                )))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Empty list with room for `count` decoded values; an error rather than an
/// abort when the allocation cannot be made.
fn decoded_list<T>(count: usize) -> Result<Vec<T>> {
    let mut list = Vec::new();
    list.try_reserve_exact(count).map_err(|e| {
        DeltaError::InvalidFormat(format!("cannot hold {} decoded values: {}", count, e))
    })?;
    Ok(list)
}

fn narrow<T: Lane>(lane: i128, data_type: DataType) -> Result<T> {
    T::from_lane(lane).ok_or_else(|| {
        DeltaError::InvalidFormat(format!(
            "decoded value {} is out of range for {}",
            lane,
            data_type.name()
        ))
    })
}

fn lane_factor<T: DeltaValue + Lane>(values: &[T]) -> T {
    let f = common_factor(values.iter().map(|v| v.to_lane().unsigned_abs()));
    i128::try_from(f)
        .ok()
        .and_then(T::from_lane)
        .unwrap_or(T::ONE)
}

fn encode_lane_block<T: DeltaValue + Lane>(
    state: &mut BlockState<T>,
    granularity: Option<T>,
) -> Result<()> {
    let mut payload = Vec::new();
    let encoding = encode_lanes(
        state.list.iter().map(|v| v.to_lane()),
        granularity.map(T::to_lane),
        state.flags.monotonicity,
        |f| T::from_lane(f).is_some(),
        &mut payload,
    );
    state.anchor = state.list.first().copied().unwrap_or(T::ZERO);
    state.factor = T::from_lane(encoding.factor).unwrap_or(T::ONE);
    state.flags.monotonicity = encoding.monotonicity;
    state.list_count = state.list.len();
    state.bytes = payload;
    Ok(())
}

fn decode_lane_block<T: DeltaValue + Lane>(state: &mut BlockState<T>) -> Result<()> {
    let mut reader = ByteReader::new(&state.bytes);
    let lanes = Lanes::read(
        state.anchor.to_lane(),
        state.factor.to_lane(),
        state.flags.monotonicity,
        state.list_count,
        &mut reader,
    )?;
    reader.expect_end("block payload")?;
    let mut list = decoded_list(state.list_count)?;
    for lane in lanes {
        list.push(narrow(lane?, T::DATA_TYPE)?);
    }
    state.list = list;
    Ok(())
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        DeltaError::InvalidFormat(format!("expected a {}-byte field, got {}", N, bytes.len()))
    })
}

// ── Integers ───────────────────────────────────────────────────────────────

macro_rules! impl_integer_delta {
    ($($t:ty => $dt:ident),* $(,)?) => {$(
        impl Lane for $t {
            #[inline]
            fn to_lane(self) -> i128 {
                self as i128
            }

            #[inline]
            fn from_lane(lane: i128) -> Option<Self> {
                <$t>::try_from(lane).ok()
            }
        }

        impl DeltaValue for $t {
            const DATA_TYPE: DataType = DataType::$dt;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            fn write_anchor(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_anchor(bytes: &[u8]) -> Result<Self> {
                Ok(<$t>::from_le_bytes(fixed(bytes)?))
            }

            fn factor(values: &[Self]) -> Self {
                lane_factor(values)
            }

            fn encode_block(state: &mut BlockState<Self>, granularity: Option<Self>) -> Result<()> {
                encode_lane_block(state, granularity)
            }

            fn decode_block(state: &mut BlockState<Self>) -> Result<()> {
                decode_lane_block(state)
            }
        }
    )*};
}

impl_integer_delta! {
    u8 => Byte,
    i8 => SByte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
}

// ── bool ───────────────────────────────────────────────────────────────────

impl Lane for bool {
    fn to_lane(self) -> i128 {
        self as i128
    }

    fn from_lane(lane: i128) -> Option<Self> {
        match lane {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
}

impl DeltaValue for bool {
    const DATA_TYPE: DataType = DataType::Bool;
    const ZERO: Self = false;
    const ONE: Self = true;

    fn write_anchor(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }

    fn read_anchor(bytes: &[u8]) -> Result<Self> {
        match fixed::<1>(bytes)? {
            [0] => Ok(false),
            [1] => Ok(true),
            [other] => Err(DeltaError::InvalidFormat(format!("invalid bool byte {}", other))),
        }
    }

    fn factor(values: &[Self]) -> Self {
        lane_factor(values)
    }

    fn encode_block(state: &mut BlockState<Self>, granularity: Option<Self>) -> Result<()> {
        encode_lane_block(state, granularity)
    }

    fn decode_block(state: &mut BlockState<Self>) -> Result<()> {
        decode_lane_block(state)
    }
}

// ── Instant / Duration ─────────────────────────────────────────────────────

macro_rules! impl_tick_delta {
    ($($t:ident),*) => {$(
        impl Lane for $t {
            fn to_lane(self) -> i128 {
                self.0 as i128
            }

            fn from_lane(lane: i128) -> Option<Self> {
                i64::try_from(lane).ok().map($t)
            }
        }

        impl DeltaValue for $t {
            const DATA_TYPE: DataType = DataType::$t;
            const ZERO: Self = $t(0);
            const ONE: Self = $t(1);

            fn write_anchor(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.0.to_le_bytes());
            }

            fn read_anchor(bytes: &[u8]) -> Result<Self> {
                Ok($t(i64::from_le_bytes(fixed(bytes)?)))
            }

            fn factor(values: &[Self]) -> Self {
                lane_factor(values)
            }

            fn encode_block(state: &mut BlockState<Self>, granularity: Option<Self>) -> Result<()> {
                encode_lane_block(state, granularity)
            }

            fn decode_block(state: &mut BlockState<Self>) -> Result<()> {
                decode_lane_block(state)
            }
        }
    )*};
}

impl_tick_delta!(Instant, Duration);

// ── Floats ─────────────────────────────────────────────────────────────────
//
// Without a usable granularity, floats travel through the lane engine as their
// raw bit patterns. With a positive granularity `g`, a block whose values are
// all exactly `k * g` for integers `k` is aliased: the `k` stream is encoded
// instead and the payload is prefixed with the varint factor of that stream.

macro_rules! impl_float_delta {
    ($t:ty, $bits:ty, $dt:ident, $alias:ident, $exact_limit:expr) => {
        impl Lane for $t {
            fn to_lane(self) -> i128 {
                self.to_bits() as i128
            }

            fn from_lane(lane: i128) -> Option<Self> {
                <$bits>::try_from(lane).ok().map(<$t>::from_bits)
            }
        }

        impl DeltaValue for $t {
            const DATA_TYPE: DataType = DataType::$dt;
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            fn write_anchor(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_anchor(bytes: &[u8]) -> Result<Self> {
                Ok(<$t>::from_le_bytes(fixed(bytes)?))
            }

            /// Common factor of the bit patterns, reinterpreted as a float.
            fn factor(values: &[Self]) -> Self {
                lane_factor(values)
            }

            fn encode_block(state: &mut BlockState<Self>, granularity: Option<Self>) -> Result<()> {
                let usable = granularity.filter(|g| g.is_finite() && *g > 0.0);
                if let Some(g) = usable {
                    let multiple = |v: $t| {
                        let k = (v / g).round();
                        let ki = k as i128;
                        (k.abs() <= $exact_limit && (ki as $t * g).to_bits() == v.to_bits())
                            .then_some(ki)
                    };
                    if state.list.iter().all(|&v| multiple(v).is_some()) {
                        let ks = state.list.iter().filter_map(move |&v| multiple(v));
                        let mut inner = Vec::new();
                        let encoding = encode_lanes(ks, None, state.flags.monotonicity, |_| true, &mut inner);
                        let mut payload = Vec::with_capacity(inner.len() + 4);
                        write_varint(encoding.factor as u128, &mut payload);
                        payload.extend_from_slice(&inner);
                        state.anchor = state.list.first().copied().unwrap_or(Self::ZERO);
                        state.factor = g;
                        state.flags.monotonicity = encoding.monotonicity;
                        state.flags.alias = Some(DataType::$alias);
                        state.list_count = state.list.len();
                        state.bytes = payload;
                        return Ok(());
                    }
                    debug!(
                        "{} block is not an exact multiple of {}; encoding bit patterns",
                        DataType::$dt.name(),
                        g
                    );
                }
                state.flags.alias = None;
                encode_lane_block(state, None)
            }

            fn decode_block(state: &mut BlockState<Self>) -> Result<()> {
                match state.flags.alias {
                    None => decode_lane_block(state),
                    Some(DataType::$alias) => {
                        let g = state.factor;
                        let mut reader = ByteReader::new(&state.bytes);
                        let inner_factor = i128::try_from(read_varint(&mut reader)?).map_err(|_| {
                            DeltaError::InvalidFormat("aliased factor overflows".to_string())
                        })?;
                        let k0 = (state.anchor / g).round() as i128;
                        let ks = Lanes::read(
                            k0,
                            inner_factor,
                            state.flags.monotonicity,
                            state.list_count,
                            &mut reader,
                        )?;
                        reader.expect_end("aliased block payload")?;
                        let mut list = decoded_list(state.list_count)?;
                        for k in ks {
                            list.push(k? as $t * g);
                        }
                        state.list = list;
                        Ok(())
                    }
                    Some(other) => Err(DeltaError::InvalidFormat(format!(
                        "{} block cannot be aliased as {}",
                        DataType::$dt.name(),
                        other.name()
                    ))),
                }
            }
        }
    };
}

// Largest magnitudes at which every integer is exactly representable.
impl_float_delta!(f32, u32, Float32, Int32, 16_777_216.0);
impl_float_delta!(f64, u64, Float64, Int64, 9_007_199_254_740_992.0);

// ── Decimal ────────────────────────────────────────────────────────────────

const DECIMAL_UNIFORM: u8 = 0;
const DECIMAL_MIXED: u8 = 1;
const DECIMAL_RAW: u8 = 2;
const DECIMAL_SIZE: usize = 16;

fn pow10(exp: u8) -> i128 {
    10i128.pow(exp as u32)
}

impl DeltaValue for Decimal {
    const DATA_TYPE: DataType = DataType::Decimal;
    const ZERO: Self = Decimal::ZERO;
    const ONE: Self = Decimal::ONE;

    fn write_anchor(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_anchor(bytes: &[u8]) -> Result<Self> {
        Decimal::from_le_bytes(fixed(bytes)?)
    }

    /// GCD of the mantissas once every value is brought to the largest scale present.
    fn factor(values: &[Self]) -> Self {
        let scale = values.iter().map(|d| d.scale()).max().unwrap_or(0);
        if !values.iter().all(|d| d.rescaled(scale).is_some()) {
            return Decimal::ONE;
        }
        let f = common_factor(values.iter().filter_map(|d| d.rescaled(scale)).map(i128::unsigned_abs));
        i128::try_from(f)
            .ok()
            .and_then(|m| Decimal::new(m, scale).ok())
            .unwrap_or(Decimal::ONE)
    }

    fn encode_block(state: &mut BlockState<Self>, granularity: Option<Self>) -> Result<()> {
        let scale = state.list.iter().map(|d| d.scale()).max().unwrap_or(0);
        state.anchor = state.list.first().copied().unwrap_or(Decimal::ZERO);
        state.list_count = state.list.len();
        let mut payload = Vec::new();

        if !state.list.iter().all(|d| d.rescaled(scale).is_some()) {
            debug!("decimal block does not fit 96 bits at scale {}; storing raw values", scale);
            payload.reserve(state.list.len() * DECIMAL_SIZE + 1);
            payload.push(DECIMAL_RAW);
            for d in &state.list {
                payload.extend_from_slice(&d.to_le_bytes());
            }
            state.factor = Decimal::ONE;
            state.flags.monotonicity = Monotonicity::None;
            state.bytes = payload;
            return Ok(());
        }

        if state.list.iter().all(|d| d.scale() == scale) {
            payload.push(DECIMAL_UNIFORM);
        } else {
            payload.push(DECIMAL_MIXED);
            payload.extend(state.list.iter().map(|d| d.scale()));
        }
        let granularity = granularity.and_then(|g| {
            let rescaled = g.rescaled(scale);
            if rescaled.is_none() {
                warn!(
                    "granularity {} cannot be expressed at block scale {}; using the computed factor",
                    g, scale
                );
            }
            rescaled
        });
        let encoding = encode_lanes(
            state.list.iter().filter_map(|d| d.rescaled(scale)),
            granularity,
            state.flags.monotonicity,
            Decimal::mantissa_fits,
            &mut payload,
        );
        state.factor = Decimal::new(encoding.factor, scale)?;
        state.flags.monotonicity = encoding.monotonicity;
        state.bytes = payload;
        Ok(())
    }

    fn decode_block(state: &mut BlockState<Self>) -> Result<()> {
        let count = state.list_count;
        let mut reader = ByteReader::new(&state.bytes);
        let mode = reader.u8("decimal payload mode")?;
        let list = match mode {
            DECIMAL_RAW => {
                let size = count.checked_mul(DECIMAL_SIZE).ok_or_else(|| {
                    DeltaError::InvalidFormat(format!("{} raw decimals overflow", count))
                })?;
                reader
                    .take(size, "raw decimals")?
                    .chunks_exact(DECIMAL_SIZE)
                    .map(|chunk| Decimal::from_le_bytes(fixed(chunk)?))
                    .collect::<Result<Vec<_>>>()?
            }
            DECIMAL_UNIFORM | DECIMAL_MIXED => {
                let scale = state.factor.scale();
                let scales = if mode == DECIMAL_MIXED {
                    Some(reader.take(count, "decimal scales")?)
                } else {
                    None
                };
                let anchor = state.anchor.rescaled(scale).ok_or_else(|| {
                    DeltaError::InvalidFormat(format!(
                        "decimal anchor cannot be expressed at block scale {}",
                        scale
                    ))
                })?;
                let lanes = Lanes::read(
                    anchor,
                    state.factor.mantissa(),
                    state.flags.monotonicity,
                    count,
                    &mut reader,
                )?;
                let mut list = decoded_list(count)?;
                for (i, lane) in lanes.enumerate() {
                    let lane = lane?;
                    let s = scales.map_or(scale, |s| s[i]);
                    let divisor = scale
                        .checked_sub(s)
                        .map(pow10)
                        .filter(|d| lane % d == 0)
                        .ok_or_else(|| {
                            DeltaError::InvalidFormat(format!(
                                "decimal value {} has no exact form at scale {}",
                                lane, s
                            ))
                        })?;
                    list.push(
                        Decimal::new(lane / divisor, s)
                            .map_err(|e| DeltaError::InvalidFormat(e.to_string()))?,
                    );
                }
                list
            }
            other => {
                return Err(DeltaError::InvalidFormat(format!(
                    "unknown decimal payload mode {}",
                    other
                )))
            }
        };
        reader.expect_end("decimal block payload")?;
        state.list = list;
        Ok(())
    }
}

// ── OffsetInstant ──────────────────────────────────────────────────────────

const OFFSETS_SHARED: u8 = 0;
const OFFSETS_PER_VALUE: u8 = 1;

impl DeltaValue for OffsetInstant {
    const DATA_TYPE: DataType = DataType::OffsetInstant;
    const ZERO: Self = OffsetInstant::new(0, 0);
    const ONE: Self = OffsetInstant::new(1, 0);

    /// UTC ticks followed by the zone offset in minutes.
    fn write_anchor(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.utc_ticks.to_le_bytes());
        out.extend_from_slice(&self.offset_minutes.to_le_bytes());
    }

    fn read_anchor(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 10] = fixed(bytes)?;
        let mut ticks = [0u8; 8];
        ticks.copy_from_slice(&raw[..8]);
        Ok(OffsetInstant::new(
            i64::from_le_bytes(ticks),
            i16::from_le_bytes([raw[8], raw[9]]),
        ))
    }

    /// The factor is a tick count only.
    fn write_factor(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.utc_ticks.to_le_bytes());
    }

    fn read_factor(bytes: &[u8]) -> Result<Self> {
        Ok(OffsetInstant::new(i64::from_le_bytes(fixed(bytes)?), 0))
    }

    fn factor(values: &[Self]) -> Self {
        let f = common_factor(values.iter().map(|v| v.utc_ticks.unsigned_abs() as u128));
        i64::try_from(f).map_or(Self::ONE, |t| OffsetInstant::new(t, 0))
    }

    fn encode_block(state: &mut BlockState<Self>, granularity: Option<Self>) -> Result<()> {
        let anchor = state.list.first().copied().unwrap_or(Self::ZERO);
        let mut payload = Vec::new();
        if state.list.iter().all(|v| v.offset_minutes == anchor.offset_minutes) {
            payload.push(OFFSETS_SHARED);
        } else {
            payload.push(OFFSETS_PER_VALUE);
            let mut inner = Vec::new();
            let encoding = encode_lanes(
                state.list.iter().map(|v| v.offset_minutes as i128),
                None,
                Monotonicity::None,
                |f| i16::try_from(f).is_ok(),
                &mut inner,
            );
            write_varint(encoding.factor as u128, &mut payload);
            payload.extend_from_slice(&inner);
        }
        let encoding = encode_lanes(
            state.list.iter().map(|v| v.utc_ticks as i128),
            granularity.map(|g| g.utc_ticks as i128),
            state.flags.monotonicity,
            |f| i64::try_from(f).is_ok(),
            &mut payload,
        );
        state.anchor = anchor;
        state.factor = OffsetInstant::new(encoding.factor as i64, 0);
        state.flags.monotonicity = encoding.monotonicity;
        state.list_count = state.list.len();
        state.bytes = payload;
        Ok(())
    }

    fn decode_block(state: &mut BlockState<Self>) -> Result<()> {
        let count = state.list_count;
        let anchor = state.anchor;
        let mut reader = ByteReader::new(&state.bytes);
        let mut offsets = match reader.u8("offset mode")? {
            OFFSETS_SHARED => None,
            OFFSETS_PER_VALUE => {
                let factor = i128::try_from(read_varint(&mut reader)?).map_err(|_| {
                    DeltaError::InvalidFormat("offset factor overflows".to_string())
                })?;
                Some(Lanes::read(
                    anchor.offset_minutes as i128,
                    factor,
                    Monotonicity::None,
                    count,
                    &mut reader,
                )?)
            }
            other => {
                return Err(DeltaError::InvalidFormat(format!(
                    "unknown offset mode {}",
                    other
                )))
            }
        };
        let ticks = Lanes::read(
            anchor.utc_ticks as i128,
            state.factor.utc_ticks as i128,
            state.flags.monotonicity,
            count,
            &mut reader,
        )?;
        reader.expect_end("offset-instant block payload")?;
        let out_of_range = || DeltaError::InvalidFormat("offset-instant out of range".to_string());
        let mut list = decoded_list(count)?;
        for tick in ticks {
            let offset = match offsets.as_mut().and_then(Iterator::next) {
                Some(lane) => i16::try_from(lane?).map_err(|_| out_of_range())?,
                None => anchor.offset_minutes,
            };
            list.push(OffsetInstant::new(
                i64::try_from(tick?).map_err(|_| out_of_range())?,
                offset,
            ));
        }
        state.list = list;
        Ok(())
    }
}
