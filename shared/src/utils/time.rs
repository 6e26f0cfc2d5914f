//! Time-related utilities

/// Nanoseconds per second, as used when folding a timestamp into seconds.
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A clock reading with second + nanosecond precision, as returned by
/// `clock_gettime`. Fields are signed so differences never wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: i64,
}

impl Timestamp {
    pub const fn new(secs: i64, nanos: i64) -> Self {
        Self { secs, nanos }
    }
}

/// Convert a nanosecond count to fractional seconds
pub fn nanos_to_secs(nanos: i64) -> f64 {
    nanos as f64 / NANOS_PER_SEC
}

/// Seconds elapsed between two readings of the same clock.
///
/// Computed as `(end.secs - start.secs) + (end.nanos - start.nanos) / 1e9`. No
/// monotonicity check is made: if the clock stepped backwards the result is
/// negative.
pub fn elapsed_secs(start: Timestamp, end: Timestamp) -> f64 {
    (end.secs - start.secs) as f64 + nanos_to_secs(end.nanos - start.nanos)
}
