//! Listen command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use rapi_shared::utils::{bytes_to_hex, parse_duration};
use rapi_shared::{Request, RequestKind, DEFAULT_RAPID_PORT};
use std::fmt;
use std::net::IpAddr;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Port to bind (the port the shim sends to)
    #[arg(short, long, env = "RAPID_PORT", default_value_t = DEFAULT_RAPID_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// Stop after this long (e.g., "30s", "5m"); runs until Ctrl-C when unset
    #[arg(short, long)]
    pub duration: Option<String>,

    /// Also print each datagram as hex
    #[arg(long)]
    pub raw: bool,
}

pub async fn run(args: ListenArgs) -> Result<()> {
    let duration = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("Failed to parse duration")?;

    let socket = UdpSocket::bind((args.bind, args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.bind, args.port))?;
    output::info(&format!("Listening on {}", socket.local_addr()?));

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut tally = Tally::default();
    // Oversized so a malformed datagram is seen whole rather than truncated.
    let mut buf = [0u8; 64];

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            _ = &mut deadline => {
                debug!("listen duration elapsed");
                break;
            }
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = received.context("Failed to receive datagram")?;
                let datagram = &buf[..len];
                match Request::from_bytes(datagram) {
                    Ok(request) => {
                        tally.record(request.kind());
                        println!("{} {}", peer, request);
                    }
                    Err(e) => {
                        tally.record_malformed();
                        warn!("{}: {}", peer, e);
                    }
                }
                if args.raw {
                    println!("    {}", bytes_to_hex(datagram));
                }
            }
        }
    }

    if tally.total() == 0 {
        output::warning("No notifications received.");
    } else {
        output::success(&tally.to_string());
    }
    Ok(())
}

/// Per-kind count of the datagrams received.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tally {
    by_kind: [u64; RequestKind::ALL.len()],
    malformed: u64,
}

impl Tally {
    pub fn record(&mut self, kind: RequestKind) {
        if let Some(i) = RequestKind::ALL.iter().position(|k| *k == kind) {
            self.by_kind[i] += 1;
        }
    }

    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    pub fn count(&self, kind: RequestKind) -> u64 {
        RequestKind::ALL
            .iter()
            .position(|k| *k == kind)
            .map_or(0, |i| self.by_kind[i])
    }

    pub fn total(&self) -> u64 {
        self.by_kind.iter().sum::<u64>() + self.malformed
    }

    /// BEGIN_COMM reports without a matching END_COMM yet.
    pub fn open_phases(&self) -> u64 {
        self.count(RequestKind::BeginComm)
            .saturating_sub(self.count(RequestKind::EndComm))
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} notification(s):", self.total())?;
        for (kind, count) in RequestKind::ALL.iter().zip(self.by_kind) {
            write!(f, " {}={}", kind, count)?;
        }
        if self.malformed > 0 {
            write!(f, " malformed={}", self.malformed)?;
        }
        if self.open_phases() > 0 {
            write!(f, " (open phases: {})", self.open_phases())?;
        }
        Ok(())
    }
}
