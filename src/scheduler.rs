use crate::counters::SweepCounters;
use crate::probe::Probe;
use crate::stream::AddressStream;
use crate::types::ProbeOutcome;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Limits applied by [`run_pool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    /// Maximum probes in flight. Must be non-zero.
    pub threads: usize,
    pub timeout: Duration,
    pub verbose: bool,
}

/// What the pool did before it returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub dispatched: u64,
    pub cancelled: bool,
}

/// Probe every address pulled from `stream`, at most `options.threads` at a time.
///
/// - A slot from a `Semaphore` is taken *before* the next address is pulled, so a
///   full pool stops draining the stream and the producer blocks on its buffer.
/// - The slot is released as soon as the probe returns, before counters and logs.
/// - Returns only after the stream is exhausted (or `cancel` fires) and every
///   spawned probe has finished.
/// - Cancellation stops pulling new addresses; probes already in flight run to
///   completion or their own timeout.
pub async fn run_pool(
    stream: &mut AddressStream,
    probe: Arc<dyn Probe>,
    counters: Arc<SweepCounters>,
    options: PoolOptions,
    cancel: &CancellationToken,
) -> PoolStats {
    let sem = Arc::new(Semaphore::new(options.threads));
    let mut set = JoinSet::new();
    let mut stats = PoolStats::default();

    loop {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                stats.cancelled = true;
                break;
            }
            permit = sem.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };
        let address = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                stats.cancelled = true;
                break;
            }
            addr = stream.recv() => match addr {
                Some(a) => a,
                None => break,
            },
        };

        // Finished tasks otherwise pile up in the set for the whole sweep.
        while let Some(res) = set.try_join_next() {
            reap(res, &counters);
        }

        let probe = probe.clone();
        let counters = counters.clone();
        let timeout = options.timeout;
        let verbose = options.verbose;
        set.spawn(async move {
            let outcome = probe.probe(address, timeout).await;
            drop(permit);
            counters.record(outcome.reachable);
            log_outcome(&outcome, verbose);
        });
        stats.dispatched += 1;
    }

    while let Some(res) = set.join_next().await {
        reap(res, &counters);
    }

    tracing::debug!(
        dispatched = stats.dispatched,
        cancelled = stats.cancelled,
        "worker pool drained"
    );
    stats
}

fn reap(res: Result<(), JoinError>, counters: &SweepCounters) {
    if let Err(e) = res {
        // The task died inside the probe, before it could record anything.
        tracing::warn!(error = %e, "probe task failed; counting address as unreachable");
        counters.record(false);
    }
}

fn log_outcome(outcome: &ProbeOutcome, verbose: bool) {
    let verdict = if outcome.reachable {
        "is reachable"
    } else {
        "is not reachable"
    };
    if verbose {
        tracing::info!(address = %outcome.address, reachable = outcome.reachable, "{} {verdict}", outcome.address);
    } else {
        tracing::debug!(address = %outcome.address, reachable = outcome.reachable, "{} {verdict}", outcome.address);
    }
    if let Some(detail) = outcome.detail.as_deref() {
        tracing::trace!(address = %outcome.address, detail, "probe output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netdetect::AddressBlock;
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky;

    #[async_trait]
    impl Probe for Flaky {
        async fn probe(&self, address: IpAddr, _timeout: Duration) -> ProbeOutcome {
            if address.to_string().ends_with(".3") {
                panic!("probe blew up");
            }
            ProbeOutcome::reachable(address, None)
        }
    }

    #[tokio::test]
    async fn panicking_probe_is_counted_unreachable() {
        let block = AddressBlock::parse("10.0.0.0/30").unwrap();
        let mut stream = AddressStream::from_block(block);
        let counters = Arc::new(SweepCounters::new());
        let options = PoolOptions {
            threads: 2,
            timeout: Duration::from_millis(50),
            verbose: false,
        };
        let stats = run_pool(
            &mut stream,
            Arc::new(Flaky),
            counters.clone(),
            options,
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(stats.dispatched, 4);
        let snap = counters.snapshot();
        assert_eq!(snap.reachable, 3);
        assert_eq!(snap.unreachable, 1);
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl Probe for Counting {
        async fn probe(&self, address: IpAddr, _timeout: Duration) -> ProbeOutcome {
            self.0.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::unreachable(address, None)
        }
    }

    #[tokio::test]
    async fn cancelled_before_start_dispatches_nothing() {
        let block = AddressBlock::parse("10.0.0.0/24").unwrap();
        let mut stream = AddressStream::from_block(block);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let probe = Arc::new(Counting(AtomicUsize::new(0)));
        let stats = run_pool(
            &mut stream,
            probe.clone(),
            Arc::new(SweepCounters::new()),
            PoolOptions {
                threads: 4,
                timeout: Duration::from_millis(50),
                verbose: true,
            },
            &cancel,
        )
        .await;
        assert!(stats.cancelled);
        assert_eq!(stats.dispatched, 0);
        assert_eq!(probe.0.load(Ordering::SeqCst), 0);
    }
}
