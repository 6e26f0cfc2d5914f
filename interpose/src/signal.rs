//! Signal counter
//!
//! Counts deliveries of one asynchronous signal (SIGCONT, sent by `rapid` when it
//! resumes a job) over the whole life of the process.
//!
//! The handler runs in signal context and may interrupt anything, including a
//! notification send. It performs a single atomic increment and nothing else: no
//! locks, no allocation, no I/O. The handler is never uninstalled.

use crate::error::RapiError;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::ffi::c_int;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use tracing::debug;

/// Deliveries seen so far. Written only by `count_delivery`.
static DELIVERIES: AtomicU64 = AtomicU64::new(0);

/// Raw number of the observed signal, 0 while nothing is installed.
static OBSERVED: AtomicI32 = AtomicI32::new(0);

extern "C" fn count_delivery(_signum: c_int) {
    DELIVERIES.fetch_add(1, Ordering::Relaxed);
}

/// Handle to the process-wide delivery counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalCounter {
    signal: Signal,
}

impl SignalCounter {
    /// Install the counting handler for `signal`.
    ///
    /// There is one counter per process: installing again for the same signal
    /// returns the existing handle, a different signal is rejected.
    pub fn install(signal: Signal) -> Result<Self, RapiError> {
        let raw = signal as i32;
        match OBSERVED.compare_exchange(0, raw, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => {}
            Err(observed) if observed == raw => return Ok(Self { signal }),
            Err(observed) => {
                return Err(RapiError::SignalAlreadyObserved {
                    observed,
                    requested: signal,
                })
            }
        }

        // SA_RESTART keeps the runtime's own blocking syscalls from failing with
        // EINTR when the job is resumed.
        let action = SigAction::new(
            SigHandler::Handler(count_delivery),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // SAFETY: the handler only touches an atomic integer.
        if let Err(source) = unsafe { sigaction(signal, &action) } {
            OBSERVED.store(0, Ordering::Release);
            return Err(RapiError::SignalInstall { signal, source });
        }

        debug!(%signal, "signal counter installed");
        Ok(Self { signal })
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Total deliveries since the handler was installed. Never call from the handler.
    pub fn count(&self) -> u64 {
        DELIVERIES.load(Ordering::Relaxed)
    }
}
