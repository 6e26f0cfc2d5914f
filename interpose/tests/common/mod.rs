//! Stand-in for `rapid`: a loopback UDP socket that decodes what it receives.

#![allow(dead_code)]

use anyhow::{Context, Result};
use rapi::UdpNotifier;
use rapi_shared::{Request, REQUEST_SIZE};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;

pub struct FakeDaemon {
    socket: UdpSocket,
}

impl FakeDaemon {
    pub fn bind() -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).context("bind fake daemon")?;
        socket.set_read_timeout(Some(Duration::from_secs(2)))?;
        Ok(Self { socket })
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    pub fn notifier(&self) -> UdpNotifier {
        UdpNotifier::new(self.port())
    }

    /// Receive exactly `n` requests, checking each datagram is a full record.
    pub fn expect(&self, n: usize) -> Result<Vec<Request>> {
        let mut buf = [0u8; 64];
        let mut requests = Vec::with_capacity(n);
        for i in 0..n {
            let len = self
                .socket
                .recv(&mut buf)
                .with_context(|| format!("waiting for datagram {} of {}", i + 1, n))?;
            anyhow::ensure!(len == REQUEST_SIZE, "datagram of {} bytes", len);
            requests.push(Request::from_bytes(&buf[..len])?);
        }
        Ok(requests)
    }

    /// True when nothing else arrives within a short grace period.
    pub fn is_quiet(&self) -> Result<bool> {
        self.socket
            .set_read_timeout(Some(Duration::from_millis(100)))?;
        let mut buf = [0u8; 64];
        let quiet = match self.socket.recv(&mut buf) {
            Ok(_) => false,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => true,
            Err(e) => return Err(e.into()),
        };
        self.socket.set_read_timeout(Some(Duration::from_secs(2)))?;
        Ok(quiet)
    }
}

pub fn own_pid() -> i32 {
    std::process::id() as i32
}
