//! Shim configuration
//!
//! Read once from the environment when the runtime is initialized.

use crate::error::RapiError;
use crate::transport::UdpNotifier;
use nix::sys::signal::Signal;
use rapi_shared::{DEFAULT_RAPID_PORT, RAPID_PORT_ENV};

/// Environment variable holding the `tracing` filter directive for the shim.
pub const RAPI_LOG_ENV: &str = "RAPI_LOG";

/// Filter used when `RAPI_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Shim configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    /// Port `rapid` listens on (loopback only)
    pub rapid_port: u16,

    /// Signal whose deliveries are counted
    pub observed_signal: Signal,

    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            rapid_port: DEFAULT_RAPID_PORT,
            observed_signal: Signal::SIGCONT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ShimConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, RapiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RapiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = lookup(RAPID_PORT_ENV) {
            config.rapid_port = parse_port(RAPID_PORT_ENV, &value)?;
        }
        if let Some(filter) = lookup(RAPI_LOG_ENV) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Transport aimed at the configured daemon.
    pub fn notifier(&self) -> UdpNotifier {
        UdpNotifier::new(self.rapid_port)
    }
}

fn parse_port(var: &'static str, value: &str) -> Result<u16, RapiError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(RapiError::InvalidPort {
            var,
            value: value.to_string(),
        }),
    }
}
