//! Monotonic runtime clock.
//!
//! Runtime times are nanoseconds on a process-local monotonic clock, offset so
//! that every issued time is strictly positive (`XrTime` zero is invalid).

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::types::Time;

/// Offset added to the elapsed time since the epoch, one second.
const BASE_NS: Time = 1_000_000_000;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Current runtime time.
pub fn now_ns() -> Time {
    BASE_NS + epoch().elapsed().as_nanos() as Time
}

/// Converts a runtime time to an `Instant`, clamping times before the epoch.
pub fn to_instant(time: Time) -> Instant {
    let since = (time - BASE_NS).max(0) as u64;
    epoch() + Duration::from_nanos(since)
}
