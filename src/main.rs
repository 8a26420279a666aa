use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topowatch::{
    DataSource, FeedConnector, FileFeedConnector, FileSource, IdleConnector, LayerPolicy,
    LogFormat, Monitor, Output, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "topowatch")]
#[command(about = "Topology and health monitor for publish/subscribe middleware")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot JSON file, or a directory of snapshots to replay
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Directory of machine_state_<host>.json feed reports
    #[arg(long)]
    feed_dir: Option<PathBuf>,

    /// Write each cycle report to this JSON file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Topic layer policy: strict or first_active
    #[arg(long)]
    layer_policy: Option<LayerPolicy>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Process a single snapshot, print the report and exit
    #[arg(long)]
    once: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(file) = &self.file {
            settings.snapshot_path = file.clone();
        }
        if let Some(dir) = &self.feed_dir {
            settings.feed_dir = Some(dir.clone());
        }
        if let Some(output) = &self.output {
            settings.output_path = Some(output.clone());
        }
        if let Some(interval) = self.interval_ms {
            settings.poll_interval_ms = interval;
        }
        if let Some(policy) = self.layer_policy {
            settings.layer_policy = policy;
        }
        if self.json_logs {
            settings.log_format = LogFormat::Json;
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        // stdout carries the --once report, logs go to stderr
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    init_tracing(settings.log_format);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args.once, settings))
}

async fn run(once: bool, settings: Settings) -> Result<()> {
    let connector: Box<dyn FeedConnector> = match &settings.feed_dir {
        Some(dir) => Box::new(FileFeedConnector::new(dir, settings.feed_poll_interval())),
        None => Box::new(IdleConnector),
    };
    let redactor = settings.redactor().context("invalid redaction rules")?;

    let mut monitor = Monitor::builder()
        .layer_policy(settings.layer_policy)
        .redactor(redactor)
        .connector(connector)
        .feed_capacity(settings.feed_channel_capacity)
        .build();

    let mut source = FileSource::new(&settings.snapshot_path);

    if once {
        let raw = source.poll().with_context(|| {
            format!(
                "no snapshot from {}: {}",
                source.description(),
                source.error().unwrap_or("no data")
            )
        })?;
        let report = monitor.cycle(&raw);
        println!("{}", serde_json::to_string_pretty(&report)?);
        if let Some(path) = &settings.output_path {
            Output::file(path).emit(&report).await?;
        }
        return Ok(());
    }

    let outputs: Vec<Output> = settings.output_path.iter().map(Output::file).collect();

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            let _ = stop_tx.send(true);
        }
    });

    monitor
        .run(Box::new(source), outputs, settings.poll_interval(), stop_rx)
        .await;
    Ok(())
}
