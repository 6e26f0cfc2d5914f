//! RAPI interposition shim
//!
//! Sits between an MPI application and its MPI library and tells the local
//! `rapid` daemon about the process:
//!
//! - REGISTER(pid) when the runtime is initialized,
//! - BEGIN_COMM / END_COMM around every blocking communication call,
//! - UNREGISTER(pid) after the runtime is finalized.
//!
//! At finalize it also prints one line with the rank, the wall-clock and CPU
//! seconds spent between init and finalize, and the number of SIGCONT signals
//! the process received.

pub mod config;
pub mod error;
pub mod logging;
pub mod mpi;
pub mod session;
pub mod signal;
pub mod timer;
pub mod transport;

pub use config::ShimConfig;
pub use error::RapiError;
pub use session::{Session, Summary};
pub use signal::SignalCounter;
pub use timer::LifecycleMark;
pub use transport::{Notifier, UdpNotifier};
