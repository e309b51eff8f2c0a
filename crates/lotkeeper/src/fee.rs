//! Usage fee for an occupancy interval.
//!
//! Flat hourly rate with a one-hour minimum. Past the first hour the fee
//! scales linearly with the stay; there is no rounding to whole hours.

use chrono::{DateTime, Utc};

/// Hourly rate used when none is configured.
pub const DEFAULT_HOURLY_RATE: f64 = 5.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("exit time {exit} is before entry time {entry}")]
    InvalidInterval {
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
    },
}

/// Price the stay between `entry` and `exit`.
///
/// `max(rate, rate * seconds / 3600)`. Fails if `exit` precedes `entry`.
pub fn compute_fee(
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
    hourly_rate: f64,
) -> Result<f64, FeeError> {
    if exit < entry {
        return Err(FeeError::InvalidInterval { entry, exit });
    }

    let elapsed = exit - entry;
    let seconds = match elapsed.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        // Only overflows past ~292k years; millisecond precision is plenty there.
        None => elapsed.num_milliseconds() as f64 / 1_000.0,
    };

    Ok(hourly_rate.max(hourly_rate * seconds / SECONDS_PER_HOUR))
}
