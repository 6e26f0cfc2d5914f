//! Shared types and utilities for RAPI
//!
//! This crate contains the wire protocol spoken between the interposition shim
//! and the `rapid` daemon, plus the small time helpers used to report lifecycle
//! durations.

pub mod protocol;
pub mod utils;

// Re-export commonly used types
pub use protocol::wire::{Pid, Request, RequestKind, WireError};
pub use protocol::{DEFAULT_RAPID_PORT, RAPID_PORT_ENV, REQUEST_SIZE};
pub use utils::time::Timestamp;
