//! Library crate for cidr-sweep: bounded-concurrency reachability sweeps over CIDR blocks.
pub mod config;
pub mod counters;
pub mod error;
pub mod netdetect;
pub mod probe;
pub mod progress;
pub mod scheduler;
pub mod stream;
pub mod sweep;
pub mod types;

pub use config::SweepConfig;
pub use error::{Result, SweepError};
pub use sweep::{run_sweep, Sweeper};
