//! # iforest-stream
//!
//! Runs the streaming isolation-forest detector over a synthetic signal and
//! reports anomalies as they are found. Runs until interrupted unless
//! `--ticks` is given.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::io;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iforest_stream::{
    ConsoleSink, DetectorConfig, JsonLinesSink, RunEvaluator, RunOptions, RunSummary,
    StreamController, SyntheticSource, TextSink,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkKind {
    /// Anomalies through the log output
    Console,
    /// "<index> Anomaly detected: <value>" lines on stdout
    Text,
    /// One JSON object per tick on stdout
    Jsonl,
}

#[derive(Parser, Debug)]
#[command(name = "iforest-stream")]
#[command(about = "Streaming anomaly detection with a sliding-window isolation forest", long_about = None)]
struct Cli {
    /// Values in the scoring window
    #[arg(long, env = "IFS_WINDOW_SIZE", default_value_t = 30)]
    window_size: usize,

    /// Expected anomaly rate, in (0, 0.5)
    #[arg(long, env = "IFS_CONTAMINATION", default_value_t = 0.05)]
    contamination: f64,

    /// Trees per refit
    #[arg(long, env = "IFS_N_ESTIMATORS", default_value_t = 100)]
    n_estimators: usize,

    /// Max points drawn per tree
    #[arg(long, env = "IFS_MAX_SAMPLES", default_value_t = 256)]
    max_samples: usize,

    /// Refit on every k-th active tick (1 = every tick)
    #[arg(long, env = "IFS_REFIT_EVERY", default_value_t = 1)]
    refit_every: usize,

    /// Seed for the model and the synthetic source
    #[arg(long, env = "IFS_SEED")]
    seed: Option<u64>,

    /// Tree-building threads (0 = all cores)
    #[arg(long, env = "IFS_N_JOBS", default_value_t = 1)]
    n_jobs: usize,

    /// Keep only the newest N values of history
    #[arg(long, env = "IFS_HISTORY_LIMIT")]
    history_limit: Option<usize>,

    /// Pause between ticks in milliseconds
    #[arg(long, env = "IFS_INTERVAL_MS", default_value_t = 1000)]
    interval_ms: u64,

    /// Stop after this many ticks
    #[arg(long, env = "IFS_TICKS")]
    ticks: Option<usize>,

    /// Where detector output goes
    #[arg(long, value_enum, default_value_t = SinkKind::Console)]
    sink: SinkKind,

    /// Emit whole frames (history and anomaly log) with --sink jsonl
    #[arg(long)]
    full_frames: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            window_size: self.window_size,
            contamination: self.contamination,
            n_estimators: self.n_estimators,
            max_samples: self.max_samples,
            refit_every: self.refit_every,
            random_state: self.seed,
            n_jobs: self.n_jobs,
            history_limit: self.history_limit,
        }
    }
}

fn init_tracing(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    // Logs go to stderr so text/jsonl output on stdout stays clean.
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = cli.detector_config();
    tracing::info!(config = %serde_json::to_string(&config)?, "starting detector");

    let mut controller = StreamController::new(config)
        .context("invalid detector configuration")?
        .with_evaluator(RunEvaluator::new(100));
    let source = SyntheticSource::new(cli.seed);
    let options = RunOptions {
        max_ticks: cli.ticks,
        interval: Duration::from_millis(cli.interval_ms),
    };

    let summary: RunSummary = match cli.sink {
        SinkKind::Console => controller.run(source, ConsoleSink, options),
        SinkKind::Text => controller.run(source, TextSink::new(io::stdout().lock()), options),
        SinkKind::Jsonl => controller.run(
            source,
            JsonLinesSink::new(io::stdout().lock()).with_full_frames(cli.full_frames),
            options,
        ),
    }
    .context("stream run failed")?;

    tracing::info!(
        ticks = summary.ticks,
        refits = summary.refits,
        anomalies = summary.anomalies,
        anomaly_rate = summary.anomaly_rate,
        mean_tick_micros = summary.mean_tick_micros,
        mean_refit_micros = summary.mean_refit_micros,
        "run finished"
    );
    Ok(())
}
