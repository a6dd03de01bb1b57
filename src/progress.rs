use crate::counters::{CounterSnapshot, SweepCounters};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Receives each progress snapshot, periodic and final alike.
pub type ProgressSink = Arc<dyn Fn(CounterSnapshot) + Send + Sync>;

/// Prints every snapshot as one line on stdout.
pub fn stdout_sink() -> ProgressSink {
    Arc::new(|snapshot| println!("{snapshot}"))
}

/// Background task that hands a counter snapshot to a sink on a fixed interval.
#[derive(Debug)]
pub struct ProgressReporter {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Start reporting. The first report fires one `every` after the call.
    pub fn spawn(counters: Arc<SweepCounters>, every: Duration, sink: ProgressSink) -> Self {
        // interval_at panics on a zero period
        let every = every.max(Duration::from_millis(1));
        let stop = CancellationToken::new();
        let token = stop.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => sink(counters.snapshot()),
                }
            }
        });
        Self { stop, handle }
    }

    /// Stop reporting and wait until the task has exited; no report is emitted after this returns.
    pub async fn stop(self) {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "progress reporter task failed");
        }
    }
}
