use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Result of one reachability probe against a single address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub address: IpAddr,
    pub reachable: bool,
    /// Raw output or error text from the probe facility, when any was produced.
    pub detail: Option<String>,
}

impl ProbeOutcome {
    pub fn reachable(address: IpAddr, detail: Option<String>) -> Self {
        Self {
            address,
            reachable: true,
            detail,
        }
    }

    pub fn unreachable(address: IpAddr, detail: Option<String>) -> Self {
        Self {
            address,
            reachable: false,
            detail,
        }
    }
}

/// Aggregate summary of a finished sweep.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub cidr: String,
    pub enumerated: u64,
    pub reachable: u64,
    pub unreachable: u64,
    pub percent_reachable: f64,
    pub elapsed_ms: u64,
    pub cancelled: bool,
    pub started_at: String,
    pub finished_at: String,
}

impl SweepReport {
    pub fn probed(&self) -> u64 {
        self.reachable + self.unreachable
    }
}
