//! Wire protocol definitions
//!
//! Every notification is a single UDP datagram holding one fixed-size
//! [`wire::Request`]. There is no framing, no length prefix and no reply.

pub mod wire;

/// Size of an encoded request on the wire, in bytes.
pub const REQUEST_SIZE: usize = 8;

/// Port `rapid` listens on when `RAPID_PORT` is not set.
pub const DEFAULT_RAPID_PORT: u16 = 12345;

/// Environment variable overriding the daemon port.
pub const RAPID_PORT_ENV: &str = "RAPID_PORT";
