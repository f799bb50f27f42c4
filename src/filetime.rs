//! Conversion between Windows FILETIME ticks and UTC timestamps.
//!
//! A FILETIME counts 100 ns ticks since 1601-01-01 00:00:00 UTC.  Only whole
//! seconds survive [`decode`]; [`encode`] is its exact inverse at that
//! resolution.

use chrono::{DateTime, Duration, Utc};

/// Ticks between 1601-01-01 and 1970-01-01.
pub const EPOCH_OFFSET: u64 = 116_444_736_000_000_000;
/// One tick is 100 ns.
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Convert a FILETIME tick count to a UTC instant, truncated to the second.
pub fn decode(ticks: u64) -> DateTime<Utc> {
    let delta = ticks as i128 - EPOCH_OFFSET as i128;
    let secs  = delta.div_euclid(TICKS_PER_SECOND as i128) as i64;
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(secs)
}

/// Convert a UTC instant to a FILETIME tick count.
///
/// Sub-second precision is dropped.  Instants outside the FILETIME range
/// saturate to `0` or `u64::MAX`.
pub fn encode(time: DateTime<Utc>) -> u64 {
    let ticks = time.timestamp() as i128 * TICKS_PER_SECOND as i128 + EPOCH_OFFSET as i128;
    ticks.clamp(0, u64::MAX as i128) as u64
}
