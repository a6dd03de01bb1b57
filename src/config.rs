//! Typed configuration handed from the CLI into the sweep engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{Result, SweepError};
use crate::netdetect::AddressBlock;
use crate::probe::ProbeMethod;

/// Settings for one sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    /// Address block to sweep, e.g. `10.0.0.0/24`.
    pub cidr: String,

    /// How long a single probe may wait for a response.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Maximum number of probes in flight at once.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Log one line per probed address.
    #[serde(default)]
    pub verbose: bool,

    /// How often the progress line is printed while the sweep runs.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,

    /// Which reachability check to run against each address.
    #[serde(default)]
    pub method: ProbeMethod,
}

fn default_timeout() -> Duration {
    Duration::from_millis(300)
}

fn default_threads() -> usize {
    500
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(1)
}

impl SweepConfig {
    pub fn new(cidr: impl Into<String>) -> Self {
        Self {
            cidr: cidr.into(),
            timeout: default_timeout(),
            threads: default_threads(),
            verbose: false,
            progress_interval: default_progress_interval(),
            method: ProbeMethod::default(),
        }
    }

    /// Check every setting and return the parsed address block.
    ///
    /// Nothing is clamped: an out-of-range value is an error.
    pub fn validate(&self) -> Result<AddressBlock> {
        let block = AddressBlock::parse(&self.cidr)?;
        if self.threads == 0 || self.threads > Semaphore::MAX_PERMITS {
            return Err(SweepError::InvalidConcurrency {
                value: self.threads,
                max: Semaphore::MAX_PERMITS,
            });
        }
        if self.timeout.is_zero() {
            return Err(SweepError::InvalidTimeout);
        }
        if self.progress_interval.is_zero() {
            return Err(SweepError::InvalidProgressInterval);
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SweepConfig::new("10.0.0.0/30");
        assert_eq!(config.threads, 500);
        assert_eq!(config.timeout, Duration::from_millis(300));
        assert_eq!(config.progress_interval, Duration::from_secs(1));
        assert!(!config.verbose);
        assert_eq!(config.method, ProbeMethod::Ping);
        assert_eq!(config.validate().unwrap().len(), 4);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = SweepConfig::new("10.0.0.0/30");
        config.threads = 0;
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidConcurrency { value: 0, .. })
        ));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut config = SweepConfig::new("10.0.0.0/30");
        config.timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(SweepError::InvalidTimeout)));

        let mut config = SweepConfig::new("10.0.0.0/30");
        config.progress_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(SweepError::InvalidProgressInterval)
        ));
    }

    #[test]
    fn test_bad_cidr_rejected() {
        let config = SweepConfig::new("not-a-cidr");
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(matches!(err, SweepError::InvalidCidr { .. }));
    }
}
