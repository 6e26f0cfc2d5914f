//! Error taxonomy for the shim

use nix::sys::signal::Signal;
use rapi_shared::{RequestKind, WireError};
use std::io;
use thiserror::Error;

/// Prefix of every fatal diagnostic written to stderr.
pub const FATAL_PREFIX: &str = "RAPI ERROR";

#[derive(Debug, Error)]
pub enum RapiError {
    #[error("creating socket failed: {0}")]
    Socket(#[source] io::Error),

    #[error("sending {kind} request failed: {source}")]
    Send {
        kind: RequestKind,
        #[source]
        source: io::Error,
    },

    #[error("sending {kind} request was truncated ({sent} of {expected} bytes)")]
    ShortWrite {
        kind: RequestKind,
        sent: usize,
        expected: usize,
    },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("invalid {var} value {value:?}: expected a port number between 1 and 65535")]
    InvalidPort { var: &'static str, value: String },

    #[error("reading {clock} failed: {source}")]
    Clock {
        clock: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error("installing {signal} handler failed: {source}")]
    SignalInstall {
        signal: Signal,
        #[source]
        source: nix::Error,
    },

    #[error("signal counter already observes signal {observed}, cannot also observe {requested}")]
    SignalAlreadyObserved { observed: i32, requested: Signal },

    #[error("runtime initialized concurrently from two threads")]
    AlreadyRegistered,

    #[error("symbol {0} not found in the loaded MPI library")]
    MissingSymbol(&'static str),
}

impl RapiError {
    /// Failures of the local environment itself, fatal for every request kind.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, RapiError::Socket(_))
    }
}

/// Report `err` on stderr and terminate the process with status 1.
pub fn fatal(err: RapiError) -> ! {
    eprintln!("{FATAL_PREFIX}: {err}");
    std::process::exit(1)
}
