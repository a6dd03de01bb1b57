use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use cidr_sweep::netdetect;
use cidr_sweep::probe::ProbeMethod;
use cidr_sweep::types::SweepReport;
use cidr_sweep::{SweepConfig, Sweeper};

/// cidr-sweep: probe every address of a CIDR block and report how many answered.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cidr-sweep",
    version,
    about = "Probe every address of a CIDR block with bounded concurrency and report how many are reachable.",
    long_about = None
)]
struct Cli {
    /// Address range to sweep, e.g. 10.1.0.0/16. If omitted, auto-detect the local /24.
    #[arg(long)]
    cidr: Option<String>,

    /// Max probes in flight at once.
    #[arg(long, default_value_t = 500)]
    threads: usize,

    /// Per-probe timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 300)]
    timeout_ms: u64,

    /// Interval between progress lines in milliseconds.
    #[arg(long = "progress-ms", default_value_t = 1000)]
    progress_ms: u64,

    /// Print one line per probed address.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    /// Reachability check to run.
    #[arg(long, value_enum, default_value_t = Method::Ping)]
    method: Method,

    /// TCP port used by `--method tcp`.
    #[arg(long, default_value_t = 80)]
    port: u16,

    /// Write the final summary as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long = "log-json", default_value_t = false)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    Ping,
    Tcp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.verbose);

    let cidr = match cli.cidr.clone() {
        Some(c) => c,
        None => {
            let detected = netdetect::detect_local_cidrs()
                .context("failed to detect local networks")?;
            let first = detected
                .first()
                .ok_or_else(|| anyhow::anyhow!("no local IPv4 network found; pass --cidr"))?;
            tracing::info!(cidr = %first, candidates = detected.len(), "auto-detected local network");
            first.to_string()
        }
    };

    let config = SweepConfig {
        cidr,
        timeout: Duration::from_millis(cli.timeout_ms),
        threads: cli.threads,
        verbose: cli.verbose,
        progress_interval: Duration::from_millis(cli.progress_ms),
        method: match cli.method {
            Method::Ping => ProbeMethod::Ping,
            Method::Tcp => ProbeMethod::Tcp { port: cli.port },
        },
    };

    let cancel = CancellationToken::new();
    let sweeper = Sweeper::new(&config, config.method.build())
        .with_context(|| format!("invalid sweep configuration for {}", config.cidr))?
        .with_cancel(cancel.clone());

    // Ctrl-C stops pulling new addresses; in-flight probes still finish.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    println!("Starting sweep for CIDR Range {}", sweeper.block());
    let report = sweeper.run().await?;

    if let Some(path) = cli.output.as_deref() {
        write_report_json(path, &report)
            .with_context(|| format!("failed to write JSON to {}", path.display()))?;
        println!("Wrote JSON summary to {}", path.display());
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the progress lines.
fn init_tracing(json: bool, verbose: bool) {
    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref(), verbose);
    if json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

/// `RUST_LOG` (or `info`), plus per-address lines from the pool when `--verbose` is set.
fn log_filter(env: Option<&str>, verbose: bool) -> EnvFilter {
    let filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    if !verbose {
        return filter;
    }
    match VERBOSE_DIRECTIVE.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

const VERBOSE_DIRECTIVE: &str = "cidr_sweep::scheduler=info";

fn write_report_json(path: &Path, report: &SweepReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
