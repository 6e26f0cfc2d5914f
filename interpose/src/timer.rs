//! Lifecycle timer
//!
//! Captures wall-clock and process CPU time at runtime init and again at
//! finalize.

use crate::error::RapiError;
use nix::time::{clock_gettime, ClockId};
use rapi_shared::utils::time::elapsed_secs;
use rapi_shared::Timestamp;

/// One reading of both time bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleMark {
    pub wall: Timestamp,
    pub cpu: Timestamp,
}

/// Durations between two marks, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elapsed {
    pub wall_secs: f64,
    pub cpu_secs: f64,
}

impl LifecycleMark {
    /// Read CPU time first, then wall-clock time.
    pub fn now() -> Result<Self, RapiError> {
        let cpu = read_clock(ClockId::CLOCK_PROCESS_CPUTIME_ID, "CLOCK_PROCESS_CPUTIME_ID")?;
        let wall = read_clock(ClockId::CLOCK_REALTIME, "CLOCK_REALTIME")?;
        Ok(Self { wall, cpu })
    }

    /// Time elapsed from `self` to `end` on each clock.
    pub fn elapsed_until(&self, end: &LifecycleMark) -> Elapsed {
        Elapsed {
            wall_secs: elapsed_secs(self.wall, end.wall),
            cpu_secs: elapsed_secs(self.cpu, end.cpu),
        }
    }
}

fn read_clock(id: ClockId, clock: &'static str) -> Result<Timestamp, RapiError> {
    let ts = clock_gettime(id).map_err(|source| RapiError::Clock { clock, source })?;
    Ok(Timestamp::new(ts.tv_sec() as i64, ts.tv_nsec() as i64))
}
