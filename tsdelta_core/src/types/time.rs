//! Tick-resolution date/time values.
//!
//! A tick is 100 ns. Instants count ticks from 0001-01-01T00:00:00 UTC.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};

use crate::error::DeltaError;

pub const TICKS_PER_SECOND: i64 = 10_000_000;
pub const NANOS_PER_TICK: i64 = 100;
/// Ticks between 0001-01-01 and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// A point in time, in ticks since 0001-01-01 UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(pub i64);

/// A signed time span in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(pub i64);

/// A UTC instant paired with the zone offset it was observed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OffsetInstant {
    pub utc_ticks: i64,
    pub offset_minutes: i16,
}

impl Instant {
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    #[inline]
    pub const fn ticks(self) -> i64 {
        self.0
    }
}

impl Duration {
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn from_seconds(seconds: i64) -> Self {
        Self(seconds * TICKS_PER_SECOND)
    }

    #[inline]
    pub const fn ticks(self) -> i64 {
        self.0
    }
}

impl OffsetInstant {
    pub const fn new(utc_ticks: i64, offset_minutes: i16) -> Self {
        Self {
            utc_ticks,
            offset_minutes,
        }
    }

    pub const fn instant(self) -> Instant {
        Instant(self.utc_ticks)
    }
}

fn ticks_from_unix(seconds: i64, subsec_nanos: u32) -> Option<i64> {
    seconds
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(subsec_nanos as i64 / NANOS_PER_TICK)?
        .checked_add(UNIX_EPOCH_TICKS)
}

fn unix_from_ticks(ticks: i64) -> Option<(i64, u32)> {
    let relative = ticks.checked_sub(UNIX_EPOCH_TICKS)?;
    let seconds = relative.div_euclid(TICKS_PER_SECOND);
    let nanos = relative.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    Some((seconds, nanos as u32))
}

fn utc_from_ticks(ticks: i64) -> Result<DateTime<Utc>, DeltaError> {
    unix_from_ticks(ticks)
        .and_then(|(s, n)| DateTime::from_timestamp(s, n))
        .ok_or_else(|| {
            DeltaError::InvalidArgument(format!("tick count {} is outside chrono's range", ticks))
        })
}

// ── chrono interop ─────────────────────────────────────────────────────────

impl TryFrom<DateTime<Utc>> for Instant {
    type Error = DeltaError;

    fn try_from(dt: DateTime<Utc>) -> Result<Self, Self::Error> {
        ticks_from_unix(dt.timestamp(), dt.timestamp_subsec_nanos())
            .map(Instant)
            .ok_or_else(|| DeltaError::InvalidArgument(format!("{} is outside the tick range", dt)))
    }
}

impl TryFrom<Instant> for DateTime<Utc> {
    type Error = DeltaError;

    fn try_from(instant: Instant) -> Result<Self, Self::Error> {
        utc_from_ticks(instant.0)
    }
}

impl TryFrom<TimeDelta> for Duration {
    type Error = DeltaError;

    fn try_from(delta: TimeDelta) -> Result<Self, Self::Error> {
        delta
            .num_seconds()
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(delta.subsec_nanos() as i64 / NANOS_PER_TICK))
            .map(Duration)
            .ok_or_else(|| DeltaError::InvalidArgument(format!("{} is outside the tick range", delta)))
    }
}

impl TryFrom<Duration> for TimeDelta {
    type Error = DeltaError;

    fn try_from(duration: Duration) -> Result<Self, Self::Error> {
        let seconds = duration.0.div_euclid(TICKS_PER_SECOND);
        let nanos = duration.0.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
        TimeDelta::try_seconds(seconds)
            .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos)))
            .ok_or_else(|| {
                DeltaError::InvalidArgument(format!(
                    "{} ticks is outside chrono's range",
                    duration.0
                ))
            })
    }
}

impl TryFrom<DateTime<FixedOffset>> for OffsetInstant {
    type Error = DeltaError;

    fn try_from(dt: DateTime<FixedOffset>) -> Result<Self, Self::Error> {
        let offset_seconds = dt.offset().local_minus_utc();
        if offset_seconds % 60 != 0 {
            return Err(DeltaError::InvalidArgument(format!(
                "zone offset of {} s is not a whole number of minutes",
                offset_seconds
            )));
        }
        let instant = Instant::try_from(dt.with_timezone(&Utc))?;
        Ok(OffsetInstant::new(instant.0, (offset_seconds / 60) as i16))
    }
}

impl TryFrom<OffsetInstant> for DateTime<FixedOffset> {
    type Error = DeltaError;

    fn try_from(value: OffsetInstant) -> Result<Self, Self::Error> {
        let offset = FixedOffset::east_opt(value.offset_minutes as i32 * 60).ok_or_else(|| {
            DeltaError::InvalidArgument(format!(
                "zone offset of {} minutes is out of range",
                value.offset_minutes
            ))
        })?;
        Ok(utc_from_ticks(value.utc_ticks)?.with_timezone(&offset))
    }
}
