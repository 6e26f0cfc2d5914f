//! Wire protocol implementation for shim-to-daemon notifications.
//!
//! Uses bincode with an explicit config so the shim and the daemon always agree on
//! the layout: fixint encoding (a `u32` tag and an `i32` pid, 4 bytes each) in the
//! host's native byte order, with trailing bytes rejected.
//!
//! ```text
//! ┌────────────────┬────────────────┐
//! │  kind (u32)    │   pid (i32)    │
//! │  4 bytes       │   4 bytes      │
//! └────────────────┴────────────────┘
//! ```
//!
//! Kind codes 2 and 3 belong to the daemons' STOP/CONT control traffic and are
//! never produced by the shim.

use super::REQUEST_SIZE;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Process ID
pub type Pid = i32;

/// Single bincode config for the wire format.
fn wire_bincode() -> impl bincode::config::Options {
    bincode::config::DefaultOptions::new()
        .with_fixint_encoding()
        .with_native_endian()
        .reject_trailing_bytes()
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("request must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("unknown request kind {0}")]
    UnknownKind(u32),

    #[error("bincode: {0}")]
    Codec(#[from] bincode::Error),
}

/// Event tag carried by every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum RequestKind {
    Unregister,
    Register,
    BeginComm,
    EndComm,
}

impl RequestKind {
    pub const ALL: [RequestKind; 4] = [
        RequestKind::Unregister,
        RequestKind::Register,
        RequestKind::BeginComm,
        RequestKind::EndComm,
    ];

    /// Numeric tag as it appears on the wire.
    pub const fn code(self) -> u32 {
        match self {
            RequestKind::Unregister => 0,
            RequestKind::Register => 1,
            RequestKind::BeginComm => 4,
            RequestKind::EndComm => 5,
        }
    }

    /// Lifecycle events carry the sender's pid and are fatal when they cannot be sent.
    pub const fn is_lifecycle(self) -> bool {
        matches!(self, RequestKind::Register | RequestKind::Unregister)
    }
}

impl From<RequestKind> for u32 {
    fn from(kind: RequestKind) -> Self {
        kind.code()
    }
}

impl TryFrom<u32> for RequestKind {
    type Error = WireError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        RequestKind::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or(WireError::UnknownKind(code))
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestKind::Unregister => "UNREGISTER",
            RequestKind::Register => "REGISTER",
            RequestKind::BeginComm => "BEGIN_COMM",
            RequestKind::EndComm => "END_COMM",
        })
    }
}

/// One notification sent to `rapid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    kind: RequestKind,
    pid: Pid,
}

impl Request {
    pub fn register(pid: Pid) -> Self {
        Self {
            kind: RequestKind::Register,
            pid,
        }
    }

    pub fn unregister(pid: Pid) -> Self {
        Self {
            kind: RequestKind::Unregister,
            pid,
        }
    }

    /// Communication-phase events never carry a pid.
    pub fn begin_comm() -> Self {
        Self {
            kind: RequestKind::BeginComm,
            pid: 0,
        }
    }

    pub fn end_comm() -> Self {
        Self {
            kind: RequestKind::EndComm,
            pid: 0,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Serialize into the fixed-size wire image.
    pub fn to_bytes(&self) -> Result<[u8; REQUEST_SIZE], WireError> {
        let mut buf = [0u8; REQUEST_SIZE];
        wire_bincode().serialize_into(&mut buf[..], self)?;
        Ok(buf)
    }

    /// Decode a datagram payload. The payload must be exactly [`REQUEST_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() != REQUEST_SIZE {
            return Err(WireError::Length {
                expected: REQUEST_SIZE,
                actual: bytes.len(),
            });
        }
        wire_bincode()
            .deserialize(bytes)
            .map_err(|err| match *err {
                // Raised only by `RequestKind`'s `try_from = "u32"`.
                bincode::ErrorKind::Custom(_) => WireError::UnknownKind(kind_code(bytes)),
                _ => WireError::Codec(err),
            })
    }
}

/// Raw tag of an encoded request of the right length.
fn kind_code(bytes: &[u8]) -> u32 {
    let mut code = [0u8; 4];
    code.copy_from_slice(&bytes[..4]);
    u32::from_ne_bytes(code)
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(pid={})", self.kind, self.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_size_is_fixed() {
        let requests = [
            Request::register(4242),
            Request::unregister(4242),
            Request::begin_comm(),
            Request::end_comm(),
        ];
        for request in requests {
            assert_eq!(request.to_bytes().unwrap().len(), REQUEST_SIZE);
            assert_eq!(
                wire_bincode().serialized_size(&request).unwrap(),
                REQUEST_SIZE as u64
            );
        }
    }

    #[test]
    fn test_layout_is_native_memory_image() {
        let bytes = Request::register(0x0102_0304).to_bytes().unwrap();
        assert_eq!(&bytes[..4], &1u32.to_ne_bytes());
        assert_eq!(&bytes[4..], &0x0102_0304i32.to_ne_bytes());

        let bytes = Request::end_comm().to_bytes().unwrap();
        assert_eq!(&bytes[..4], &5u32.to_ne_bytes());
        assert_eq!(&bytes[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_matches_encode() {
        for pid in [0, 1, 31337, -1, i32::MIN, i32::MAX] {
            let requests = [
                Request::register(pid),
                Request::unregister(pid),
                Request::begin_comm(),
                Request::end_comm(),
            ];
            for request in requests {
                let decoded = Request::from_bytes(&request.to_bytes().unwrap()).unwrap();
                assert_eq!(decoded, request, "{request}");
            }
        }
        let decoded = Request::from_bytes(&Request::unregister(i32::MIN).to_bytes().unwrap());
        assert_eq!(decoded.unwrap().pid(), i32::MIN);
    }

    #[test]
    fn test_serde_decode_rejects_unknown_kind() {
        let mut bytes = Request::register(9).to_bytes().unwrap();
        bytes[..4].copy_from_slice(&3u32.to_ne_bytes());
        let err = wire_bincode().deserialize::<Request>(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown request kind 3"));
    }

    #[test]
    fn test_phase_events_carry_no_pid() {
        assert_eq!(Request::begin_comm().pid(), 0);
        assert_eq!(Request::end_comm().pid(), 0);
        assert!(!RequestKind::BeginComm.is_lifecycle());
        assert!(RequestKind::Register.is_lifecycle());
    }

    #[test]
    fn test_wrong_length_rejected() {
        let bytes = Request::begin_comm().to_bytes().unwrap();
        assert!(matches!(
            Request::from_bytes(&bytes[..7]),
            Err(WireError::Length { actual: 7, .. })
        ));

        let mut long = bytes.to_vec();
        long.push(0);
        assert!(matches!(
            Request::from_bytes(&long),
            Err(WireError::Length { actual: 9, .. })
        ));
    }

    #[test]
    fn test_daemon_control_codes_rejected() {
        for code in [2u32, 3, 6, u32::MAX] {
            let mut bytes = [0u8; REQUEST_SIZE];
            bytes[..4].copy_from_slice(&code.to_ne_bytes());
            assert!(matches!(
                Request::from_bytes(&bytes),
                Err(WireError::UnknownKind(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_kind_codes() {
        let codes: Vec<u32> = RequestKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes, vec![0, 1, 4, 5]);
        assert_eq!(RequestKind::try_from(4).unwrap(), RequestKind::BeginComm);
        assert_eq!(RequestKind::EndComm.to_string(), "END_COMM");
    }
}
