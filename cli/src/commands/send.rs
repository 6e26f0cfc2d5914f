//! Send command implementation

use crate::output;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use rapi_shared::{Pid, Request, DEFAULT_RAPID_PORT, REQUEST_SIZE};
use std::net::{IpAddr, Ipv4Addr};
use tokio::net::UdpSocket;
use tracing::debug;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Notification to send
    #[arg(value_enum)]
    pub kind: Kind,

    /// Process ID carried by REGISTER/UNREGISTER (default: this process)
    #[arg(short, long)]
    pub pid: Option<Pid>,

    /// Daemon port
    #[arg(long, env = "RAPID_PORT", default_value_t = DEFAULT_RAPID_PORT)]
    pub port: u16,

    /// Daemon address
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Register,
    Unregister,
    BeginComm,
    EndComm,
}

impl Kind {
    /// Phase events always carry pid 0, whatever `--pid` says.
    pub fn request(self, pid: Pid) -> Request {
        match self {
            Kind::Register => Request::register(pid),
            Kind::Unregister => Request::unregister(pid),
            Kind::BeginComm => Request::begin_comm(),
            Kind::EndComm => Request::end_comm(),
        }
    }
}

pub async fn run(args: SendArgs) -> Result<()> {
    let pid = args.pid.unwrap_or_else(|| std::process::id() as Pid);
    let request = args.kind.request(pid);
    let bytes = request.to_bytes().context("Failed to encode request")?;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .context("Failed to create socket")?;
    let sent = socket
        .send_to(&bytes, (args.host, args.port))
        .await
        .with_context(|| format!("Failed to send {} to {}:{}", request, args.host, args.port))?;
    debug!("{} bytes sent from {}", sent, socket.local_addr()?);

    if sent != REQUEST_SIZE {
        anyhow::bail!("Short write: {} of {} bytes", sent, REQUEST_SIZE);
    }

    output::success(&format!("Sent {} to {}:{}", request, args.host, args.port));
    Ok(())
}
