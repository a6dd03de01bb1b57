//! Reachability checks run once per swept address.
//!
//! A probe never fails: anything that is not a positive answer from the target
//! within the timeout is reported as an unreachable [`ProbeOutcome`].

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time;

use crate::types::ProbeOutcome;

/// Extra time a `ping` subprocess gets beyond the probe timeout before it is killed.
/// Output that arrives inside this window still counts as a late, unreachable reply.
const SPAWN_GRACE: Duration = Duration::from_millis(200);

/// One existence check against one address.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, address: IpAddr, timeout: Duration) -> ProbeOutcome;
}

/// Selects the probe implementation used by a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// One ICMP echo request through the system `ping` binary.
    #[default]
    Ping,
    /// Unprivileged TCP connect to the given port.
    Tcp { port: u16 },
}

impl ProbeMethod {
    pub fn build(&self) -> Arc<dyn Probe> {
        match *self {
            Self::Ping => Arc::new(PingProbe::default()),
            Self::Tcp { port } => Arc::new(TcpConnectProbe::new(port)),
        }
    }
}

/// Sends a single echo request by running the system `ping` command.
#[derive(Debug, Clone)]
pub struct PingProbe {
    program: String,
}

impl PingProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, address: IpAddr, timeout: Duration) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(ping_args(address, timeout))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new("ping")
    }
}

#[cfg(target_os = "windows")]
fn ping_args(address: IpAddr, timeout: Duration) -> Vec<String> {
    vec![
        "-n".into(),
        "1".into(),
        "-w".into(),
        timeout.as_millis().max(1).to_string(),
        address.to_string(),
    ]
}

#[cfg(target_os = "macos")]
fn ping_args(address: IpAddr, timeout: Duration) -> Vec<String> {
    vec![
        "-c".into(),
        "1".into(),
        "-W".into(),
        timeout.as_millis().max(1).to_string(),
        address.to_string(),
    ]
}

// iputils and busybox both take whole seconds for -W; `PingProbe::probe` enforces the exact bound.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn ping_args(address: IpAddr, timeout: Duration) -> Vec<String> {
    let secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
    vec![
        "-c".into(),
        "1".into(),
        "-W".into(),
        secs.to_string(),
        address.to_string(),
    ]
}

#[async_trait]
impl Probe for PingProbe {
    async fn probe(&self, address: IpAddr, timeout: Duration) -> ProbeOutcome {
        let mut cmd = self.command(address, timeout);
        let start = Instant::now();
        let output = match time::timeout(timeout + SPAWN_GRACE, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ProbeOutcome::unreachable(address, Some(format!("{}: {e}", self.program)))
            }
            Err(_) => return ProbeOutcome::unreachable(address, None),
        };
        let elapsed = start.elapsed();

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if elapsed > timeout {
            tracing::trace!(address = %address, elapsed_ms = elapsed.as_millis() as u64, "ping answered after timeout");
            ProbeOutcome::unreachable(address, Some(text))
        } else if output.status.success() && text.contains(&address.to_string()) {
            ProbeOutcome::reachable(address, Some(text))
        } else {
            ProbeOutcome::unreachable(address, (!text.is_empty()).then_some(text))
        }
    }
}

/// Treats a completed TCP handshake or an explicit refusal as proof the host exists.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnectProbe {
    port: u16,
}

impl TcpConnectProbe {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl Probe for TcpConnectProbe {
    async fn probe(&self, address: IpAddr, timeout: Duration) -> ProbeOutcome {
        let addr = SocketAddr::new(address, self.port);
        match time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => {
                ProbeOutcome::reachable(address, Some(format!("port {} open", self.port)))
            }
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                ProbeOutcome::reachable(address, Some(format!("port {} refused", self.port)))
            }
            Ok(Err(e)) => ProbeOutcome::unreachable(address, Some(e.to_string())),
            Err(_) => ProbeOutcome::unreachable(address, None),
        }
    }
}
