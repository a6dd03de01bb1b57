use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reachable/unreachable tallies shared by the worker pool and the progress reporter.
///
/// Both counters only ever grow. Workers update them through [`SweepCounters::record`],
/// readers take a [`CounterSnapshot`].
#[derive(Debug, Default)]
pub struct SweepCounters {
    reachable: AtomicU64,
    unreachable: AtomicU64,
}

impl SweepCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, reachable: bool) {
        if reachable {
            self.reachable.fetch_add(1, Ordering::Relaxed);
        } else {
            self.unreachable.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            reachable: self.reachable.load(Ordering::Relaxed),
            unreachable: self.unreachable.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SweepCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub reachable: u64,
    pub unreachable: u64,
}

impl CounterSnapshot {
    pub fn total(&self) -> u64 {
        self.reachable + self.unreachable
    }

    /// Share of reachable hosts in percent, or `None` before any probe has completed.
    pub fn percent_reachable(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.reachable as f64 * 100.0 / total as f64),
        }
    }
}

/// Renders `<percent>% (Reachable: <n>, Unreachable: <m>)`; `0.00%` while nothing has completed.
impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% (Reachable: {}, Unreachable: {})",
            self.percent_reachable().unwrap_or(0.0),
            self.reachable,
            self.unreachable
        )
    }
}
