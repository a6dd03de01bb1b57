//! One complete pass over an address block: enumerate, probe, report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ::time::{format_description::well_known, OffsetDateTime};
use tokio_util::sync::CancellationToken;

use crate::config::SweepConfig;
use crate::counters::SweepCounters;
use crate::error::Result;
use crate::netdetect::AddressBlock;
use crate::probe::Probe;
use crate::progress::{stdout_sink, ProgressReporter, ProgressSink};
use crate::scheduler::{run_pool, PoolOptions};
use crate::stream::AddressStream;
use crate::types::SweepReport;

/// Validate `config`, then sweep its block with `probe`, printing progress to stdout.
pub async fn run_sweep(config: &SweepConfig, probe: Arc<dyn Probe>) -> Result<SweepReport> {
    Sweeper::new(config, probe)?.run().await
}

/// A validated, ready-to-run sweep.
pub struct Sweeper {
    block: AddressBlock,
    options: PoolOptions,
    progress_interval: Duration,
    probe: Arc<dyn Probe>,
    sink: ProgressSink,
    cancel: CancellationToken,
}

impl Sweeper {
    /// Fails with a configuration error before any address is enumerated.
    pub fn new(config: &SweepConfig, probe: Arc<dyn Probe>) -> Result<Self> {
        let block = config.validate()?;
        Ok(Self {
            block,
            options: PoolOptions {
                threads: config.threads,
                timeout: config.timeout,
                verbose: config.verbose,
            },
            progress_interval: config.progress_interval,
            probe,
            sink: stdout_sink(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn block(&self) -> AddressBlock {
        self.block
    }

    pub async fn run(&self) -> Result<SweepReport> {
        self.run_stream(AddressStream::from_block(self.block)).await
    }

    /// Sweep an already-open stream.
    ///
    /// On an enumeration fault the probes already in flight are drained, the
    /// final progress line is still emitted, and then the fault is returned.
    pub async fn run_stream(&self, mut stream: AddressStream) -> Result<SweepReport> {
        let started_at = now_rfc3339();
        let start = Instant::now();
        let counters = Arc::new(SweepCounters::new());

        tracing::info!(
            cidr = %self.block,
            addresses = %self.block.len(),
            threads = self.options.threads,
            timeout_ms = self.options.timeout.as_millis() as u64,
            "starting sweep"
        );

        let reporter =
            ProgressReporter::spawn(counters.clone(), self.progress_interval, self.sink.clone());
        let stats = run_pool(
            &mut stream,
            self.probe.clone(),
            counters.clone(),
            self.options,
            &self.cancel,
        )
        .await;
        let enumerated = stream.finish().await;
        reporter.stop().await;

        let last = counters.snapshot();
        (self.sink)(last);

        let enumerated = match enumerated {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, probed = last.total(), "sweep aborted");
                return Err(e);
            }
        };
        if stats.cancelled {
            tracing::warn!(dispatched = stats.dispatched, "sweep cancelled");
        }

        let report = SweepReport {
            cidr: self.block.to_string(),
            // On cancel the producer may have buffered addresses that were never probed.
            enumerated: enumerated.min(stats.dispatched),
            reachable: last.reachable,
            unreachable: last.unreachable,
            percent_reachable: last.percent_reachable().unwrap_or(0.0),
            elapsed_ms: start.elapsed().as_millis() as u64,
            cancelled: stats.cancelled,
            started_at,
            finished_at: now_rfc3339(),
        };
        tracing::info!(
            reachable = report.reachable,
            unreachable = report.unreachable,
            elapsed_ms = report.elapsed_ms,
            "sweep complete"
        );
        Ok(report)
    }
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
