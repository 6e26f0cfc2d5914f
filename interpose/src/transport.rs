//! Datagram transport to `rapid`
//!
//! Each notification opens its own unconnected UDP socket, fires one datagram
//! and drops the socket. Nothing is ever read back.

use crate::error::RapiError;
use rapi_shared::Request;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use tracing::trace;

/// Sink for requests bound for the daemon.
pub trait Notifier {
    /// Deliver one request. Returns once the local kernel has accepted it.
    fn notify(&self, request: Request) -> Result<(), RapiError>;
}

/// Fire-and-forget UDP notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpNotifier {
    destination: SocketAddrV4,
}

impl UdpNotifier {
    /// Notifier for a daemon on the loopback interface.
    pub fn new(port: u16) -> Self {
        Self::with_address(Ipv4Addr::LOCALHOST, port)
    }

    pub fn with_address(address: Ipv4Addr, port: u16) -> Self {
        Self {
            destination: SocketAddrV4::new(address, port),
        }
    }

    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }
}

impl Notifier for UdpNotifier {
    fn notify(&self, request: Request) -> Result<(), RapiError> {
        let payload = request.to_bytes()?;
        let socket =
            UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(RapiError::Socket)?;

        let sent = socket
            .send_to(&payload, self.destination)
            .map_err(|source| RapiError::Send {
                kind: request.kind(),
                source,
            })?;
        if sent != payload.len() {
            return Err(RapiError::ShortWrite {
                kind: request.kind(),
                sent,
                expected: payload.len(),
            });
        }

        trace!(%request, destination = %self.destination, "notification sent");
        Ok(())
    }
}
