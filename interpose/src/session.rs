//! Per-process interception session
//!
//! Lifecycle of one instrumented process:
//!
//! ```text
//! Uninitialized ──init──▶ Registered ──finalize──▶ Unregistered
//!                            │   ▲
//!                   call in  │   │ call returns
//!                            ▼   │
//!                       InCommunication
//! ```
//!
//! REGISTER/UNREGISTER failures are fatal to the caller. BEGIN_COMM/END_COMM are
//! best effort: losing one phase report must never abort a running computation.

use crate::error::{fatal, RapiError};
use crate::signal::SignalCounter;
use crate::timer::LifecycleMark;
use crate::transport::Notifier;
use nix::sys::signal::Signal;
use nix::unistd::getpid;
use rapi_shared::{Pid, Request};
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const REGISTERED: u8 = 1;
const UNREGISTERED: u8 = 2;

/// Line printed at finalize: `rank, wall_seconds, cpu_seconds, signal_count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub rank: i32,
    pub wall_secs: f64,
    pub cpu_secs: f64,
    pub signals: u64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {:.6}, {:.6}, {}",
            self.rank, self.wall_secs, self.cpu_secs, self.signals
        )
    }
}

/// State carried from runtime init to runtime finalize.
pub struct Session<N> {
    notifier: N,
    pid: Pid,
    signals: SignalCounter,
    started: LifecycleMark,
    state: AtomicU8,
    in_flight: AtomicU32,
}

impl<N: Notifier> Session<N> {
    /// Register with the daemon, start counting `signal`, and take the start mark.
    pub fn register(notifier: N, signal: Signal) -> Result<Self, RapiError> {
        let pid = getpid().as_raw();
        notifier.notify(Request::register(pid))?;
        let signals = SignalCounter::install(signal)?;
        let started = LifecycleMark::now()?;
        info!(pid, "registered with rapid");

        Ok(Self {
            notifier,
            pid,
            signals,
            started,
            state: AtomicU8::new(REGISTERED),
            in_flight: AtomicU32::new(0),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn is_registered(&self) -> bool {
        self.state.load(Ordering::Acquire) == REGISTERED
    }

    /// Number of threads currently inside an intercepted primitive.
    pub fn in_communication(&self) -> u32 {
        self.in_flight.load(Ordering::Relaxed)
    }

    pub fn signal_count(&self) -> u64 {
        self.signals.count()
    }

    /// Bracket `call` with BEGIN_COMM/END_COMM and return its result untouched.
    ///
    /// END_COMM is sent whatever `call` returned. Outside the registered window
    /// the call passes straight through.
    pub fn intercept<R>(&self, call: impl FnOnce() -> R) -> R {
        if !self.is_registered() {
            return call();
        }

        self.in_flight.fetch_add(1, Ordering::Relaxed);
        self.report_phase(Request::begin_comm());
        let ret = call();
        self.report_phase(Request::end_comm());
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        ret
    }

    fn report_phase(&self, request: Request) {
        match self.notifier.notify(request) {
            Ok(()) => {}
            Err(err) if err.is_setup_failure() => fatal(err),
            Err(err) => warn!("dropping {} notification: {}", request.kind(), err),
        }
    }

    /// Run the real finalize, print the summary line to `out`, then unregister.
    ///
    /// Intercepted calls made from here on pass straight through.
    pub fn finalize<R, W>(
        &self,
        rank: i32,
        finalize: impl FnOnce() -> R,
        out: &mut W,
    ) -> Result<(Summary, R), RapiError>
    where
        W: Write,
    {
        self.state.store(UNREGISTERED, Ordering::Release);

        let ret = finalize();
        let finished = LifecycleMark::now()?;
        let elapsed = self.started.elapsed_until(&finished);
        let summary = Summary {
            rank,
            wall_secs: elapsed.wall_secs,
            cpu_secs: elapsed.cpu_secs,
            signals: self.signals.count(),
        };
        if let Err(err) = writeln!(out, "{summary}").and_then(|()| out.flush()) {
            warn!("failed to write summary: {}", err);
        }

        self.notifier.notify(Request::unregister(self.pid))?;
        info!(pid = self.pid, "unregistered from rapid");
        Ok((summary, ret))
    }
}

/// Runtime-init hook.
///
/// Registers before `init` runs; on any error `init` is never invoked. A
/// repeated init goes straight to the runtime, which reports the misuse itself.
pub fn runtime_init<N, R>(
    slot: &OnceLock<Session<N>>,
    notifier: N,
    signal: Signal,
    init: impl FnOnce() -> R,
) -> Result<R, RapiError>
where
    N: Notifier,
{
    if slot.get().is_some() {
        warn!("runtime initialized twice, passing the call through");
        return Ok(init());
    }
    let session = Session::register(notifier, signal)?;
    if slot.set(session).is_err() {
        return Err(RapiError::AlreadyRegistered);
    }
    Ok(init())
}

/// Intercepted-primitive hook.
pub fn intercept<N, R>(slot: &OnceLock<Session<N>>, call: impl FnOnce() -> R) -> R
where
    N: Notifier,
{
    match slot.get() {
        Some(session) => session.intercept(call),
        None => call(),
    }
}

/// Runtime-finalize hook.
///
/// `rank` is queried before `finalize` runs. Without a registered session the
/// real finalize is still called, but nothing is printed or sent.
pub fn runtime_finalize<N, R, W>(
    slot: &OnceLock<Session<N>>,
    rank: impl FnOnce() -> i32,
    finalize: impl FnOnce() -> R,
    out: &mut W,
) -> Result<R, RapiError>
where
    N: Notifier,
    W: Write,
{
    let Some(session) = slot.get().filter(|session| session.is_registered()) else {
        warn!("finalize called without an active rapi session");
        return Ok(finalize());
    };

    let rank = rank();
    debug!(rank, in_communication = session.in_communication(), "finalizing");
    let (_, ret) = session.finalize(rank, finalize, out)?;
    Ok(ret)
}
