use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

use spyrelay::aggregate::Aggregator;
use spyrelay::clock::SystemClock;
use spyrelay::config::{self, Config, MetricKind};
use spyrelay::pipeline::{PipelineOptions, Processor};
use spyrelay::plugins;
use spyrelay::sender::IngestSender;

/// Relays sampling-profiler stack output to a Pyroscope-compatible server.
#[derive(Parser)]
#[command(name = "spyrelay", about)]
struct Cli {
    /// Path to an optional YAML configuration file; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ingestion server base URL. Example: https://pyroscope.example.com
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Name the application reports samples under.
    #[arg(short = 'a', long)]
    app_name: Option<String>,

    /// Bearer token for the ingestion endpoint.
    #[arg(long)]
    auth_token: Option<String>,

    /// Profiler sampling rate in Hz.
    #[arg(short = 'r', long)]
    rate_hz: Option<u32>,

    /// Maximum time between dispatches, in seconds.
    #[arg(short = 'i', long)]
    interval: Option<u64>,

    /// Maximum number of grouped traces per dispatch.
    #[arg(short = 'b', long)]
    batch: Option<usize>,

    /// Dispatch queue capacity bounding memory when the server is slow.
    #[arg(short = 'f', long)]
    queue_capacity: Option<usize>,

    /// Maximum concurrent ingest requests.
    #[arg(short = 'c', long)]
    concurrent_requests: Option<usize>,

    /// Static tag attached to every sample (repeatable). Example: host=server1
    #[arg(short = 't', long = "tag")]
    tags: Vec<String>,

    /// Plugin to apply, in order (repeatable).
    #[arg(short = 'p', long = "plugin")]
    plugins: Vec<String>,

    /// Aggregation metric.
    #[arg(short = 'm', long, value_enum)]
    metric: Option<MetricKind>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(true).init();

    let mut cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    apply_cli_overrides(&mut cfg, &cli)?;
    cfg.validate()?;

    tracing::info!(
        server = %cfg.server,
        app = %cfg.app_name,
        interval = ?cfg.interval,
        batch_limit = cfg.batch_limit,
        metric = ?cfg.metric,
        "starting spyrelay",
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(run(cfg))
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(server) = &cli.server {
        cfg.server = server.clone();
    }
    if let Some(app_name) = &cli.app_name {
        cfg.app_name = app_name.clone();
    }
    if let Some(auth_token) = &cli.auth_token {
        cfg.auth_token = auth_token.clone();
    }
    if let Some(rate_hz) = cli.rate_hz {
        cfg.rate_hz = rate_hz;
    }
    if let Some(interval) = cli.interval {
        cfg.interval = Duration::from_secs(interval);
    }
    if let Some(batch) = cli.batch {
        cfg.batch_limit = batch;
    }
    if let Some(queue_capacity) = cli.queue_capacity {
        cfg.queue_capacity = queue_capacity;
    }
    if let Some(concurrent_requests) = cli.concurrent_requests {
        cfg.concurrent_request_limit = concurrent_requests;
    }
    for raw in &cli.tags {
        let (name, value) = config::parse_tag(raw)?;
        cfg.tags.insert(name, value);
    }
    if !cli.plugins.is_empty() {
        cfg.plugins = cli.plugins.clone();
    }
    if let Some(metric) = cli.metric {
        cfg.metric = metric;
    }
    Ok(())
}

async fn run(cfg: Config) -> Result<()> {
    let plugins = plugins::build_chain(&cfg.plugins)?;
    let aggregator = Aggregator::for_metric(cfg.metric);
    let sender = Arc::new(IngestSender::new(
        cfg.server.clone(),
        cfg.app_name.clone(),
        cfg.rate_hz,
        cfg.tags.clone(),
        cfg.auth_token.clone(),
    )?);
    let clock = Arc::new(SystemClock);

    let processor = Processor::new(
        PipelineOptions {
            interval_secs: cfg.interval.as_secs(),
            batch_limit: cfg.batch_limit,
            queue_capacity: cfg.queue_capacity,
            concurrent_request_limit: cfg.concurrent_request_limit,
        },
        aggregator,
        plugins,
        sender,
        clock,
    );

    let stdin = BufReader::new(tokio::io::stdin());
    processor.run(stdin).await?;

    tracing::info!("spyrelay stopped");
    Ok(())
}
