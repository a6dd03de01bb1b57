//! Error types for the sweep engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("invalid CIDR block {input:?}: {reason}")]
    InvalidCidr { input: String, reason: String },

    #[error("concurrency limit must be between 1 and {max}, got {value}")]
    InvalidConcurrency { value: usize, max: usize },

    #[error("probe timeout must be greater than zero")]
    InvalidTimeout,

    #[error("progress interval must be greater than zero")]
    InvalidProgressInterval,

    #[error("address enumeration failed: {0}")]
    Enumeration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    /// True for errors raised while validating configuration, before any probe runs.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidCidr { .. }
                | Self::InvalidConcurrency { .. }
                | Self::InvalidTimeout
                | Self::InvalidProgressInterval
        )
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;
