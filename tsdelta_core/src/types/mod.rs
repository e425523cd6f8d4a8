//! Value types carried by blocks: the type-code table plus the decimal and
//! date/time values that have no direct primitive equivalent.

mod data_type;
mod decimal;
mod time;

pub use data_type::DataType;
pub use decimal::Decimal;
pub use time::{Duration, Instant, OffsetInstant, TICKS_PER_SECOND, UNIX_EPOCH_TICKS};
