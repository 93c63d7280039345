mod config;
mod db;
mod error;
mod insights;
mod recommend;
mod revenue;
mod store;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Config;
use error::Error;
use log::{info, warn};
use recommend::{
    Metric, OutlierRequest, RecommendationRequest, ThresholdRequest,
    CONSERVATIVE_OUTLIER_MULTIPLIER,
};
use revenue::RevenueRequest;
use std::path::{Path, PathBuf};
use std::time::Duration;
use store::SqliteStore;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "ldk-insights",
    about = "Channel health metrics, close recommendations and revenue reports"
)]
struct Cli {
    /// Path to ldk-insights.toml config file
    #[arg(short, long, default_value = "ldk-insights.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the insight record of every channel
    Insights,
    /// Recommend closing channels that are low outliers for a metric
    Outliers {
        #[arg(short, long)]
        metric: Option<Metric>,
        /// Minimum monitored time in seconds
        #[arg(long)]
        minimum_monitored: Option<u64>,
        /// IQR multiplier (1.5 aggressive, 3.0 conservative)
        #[arg(long)]
        multiplier: Option<f64>,
        /// Use the conservative multiplier (3.0)
        #[arg(long, conflicts_with = "multiplier")]
        conservative: bool,
    },
    /// Recommend closing channels whose metric is below a threshold
    Threshold {
        #[arg(short, long)]
        metric: Option<Metric>,
        /// Minimum monitored time in seconds
        #[arg(long)]
        minimum_monitored: Option<u64>,
        #[arg(long, allow_hyphen_values = true)]
        threshold: f64,
    },
    /// Attribute forwarding revenue between channel pairs
    Revenue {
        /// Target channel point (repeatable); all channels when omitted
        #[arg(long = "chan-point")]
        chan_points: Vec<String>,
        /// Window start, unix seconds (default: end minus the configured window)
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,
        /// Window end, unix seconds, exclusive (default: now)
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i64>,
    },
    /// Import a JSON array of channel insights
    ImportChannels { file: PathBuf },
    /// Import a JSON array of forwarding events
    ImportForwards { file: PathBuf },
    /// Print a summary of the database
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    let log_level = match &cli.log_level {
        Some(level) => config::parse_log_level(level).context("Invalid --log-level")?,
        None => config::parse_log_level(&config.general.log_level)?,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    info!("ldk-insights v{}", env!("CARGO_PKG_VERSION"));

    let db = db::Database::open(&config.general.database_path)?;
    let store = SqliteStore::new(db);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling request");
            on_signal.cancel();
        }
    });

    let output = run_command(&config, &store, cli.command, &cancel).await?;
    println!("{}", output);
    Ok(())
}

/// Execute one subcommand and render its output.
async fn run_command(
    config: &Config,
    store: &SqliteStore,
    command: Commands,
    cancel: &CancellationToken,
) -> anyhow::Result<String> {
    match command {
        Commands::Insights => {
            let insights = insights::channel_insights(store, cancel).await?;
            Ok(serde_json::to_string_pretty(&insights)?)
        }
        Commands::Outliers {
            metric,
            minimum_monitored,
            multiplier,
            conservative,
        } => {
            let multiplier = if conservative {
                CONSERVATIVE_OUTLIER_MULTIPLIER
            } else {
                multiplier.unwrap_or(config.recommend.outlier_multiplier)
            };
            let req = OutlierRequest {
                rec: recommendation_request(config, metric, minimum_monitored)?,
                multiplier: Some(multiplier),
            };
            let report = recommend::outlier_recommendations(store, cancel, &req).await?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Commands::Threshold {
            metric,
            minimum_monitored,
            threshold,
        } => {
            let req = ThresholdRequest {
                rec: recommendation_request(config, metric, minimum_monitored)?,
                threshold,
            };
            let report = recommend::threshold_recommendations(store, cancel, &req).await?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Commands::Revenue {
            chan_points,
            start,
            end,
        } => {
            let end_time = end.unwrap_or_else(|| chrono::Utc::now().timestamp());
            let start_time = match start {
                Some(start) => start,
                None => default_window_start(end_time, config.revenue.window_days)?,
            };
            let req = RevenueRequest {
                chan_points,
                start_time,
                end_time,
            };
            let reports = revenue::revenue_report(store, cancel, &req).await?;
            Ok(serde_json::to_string_pretty(&reports)?)
        }
        Commands::ImportChannels { file } => {
            let insights: Vec<insights::ChannelInsight> = read_json(&file)?;
            let n = store.import_insights(&insights)?;
            Ok(format!("Imported {} channel insights from {}", n, file.display()))
        }
        Commands::ImportForwards { file } => {
            let events: Vec<revenue::ForwardingEvent> = read_json(&file)?;
            let n = store.import_events(&events)?;
            Ok(format!("Imported {} forwarding events from {}", n, file.display()))
        }
        Commands::Status => format_status(store),
    }
}

fn recommendation_request(
    config: &Config,
    metric: Option<Metric>,
    minimum_monitored: Option<u64>,
) -> anyhow::Result<RecommendationRequest> {
    let metric = match metric {
        Some(m) => m,
        None => config.default_metric()?,
    };
    let secs = minimum_monitored.unwrap_or(config.recommend.minimum_monitored_secs);
    Ok(RecommendationRequest {
        minimum_monitored: Duration::from_secs(secs),
        metric,
    })
}

/// `end_time` minus the configured look-back, if representable.
fn default_window_start(end_time: i64, window_days: u64) -> Result<i64, Error> {
    window_days
        .checked_mul(86400)
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| end_time.checked_sub(secs))
        .ok_or_else(|| {
            Error::invalid(format!(
                "window of {} days before {} is out of range",
                window_days, end_time
            ))
        })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn format_status(store: &SqliteStore) -> anyhow::Result<String> {
    let status = store.status()?;

    let span = match (status.first_event, status.last_event) {
        (Some(first), Some(last)) => format!("{} .. {}", format_time(first), format_time(last)),
        _ => "none".to_string(),
    };

    Ok(format!(
        "ldk-insights Status\n\
         ===================\n\
         Channels tracked:       {} ({} private)\n\
         Forwarding events:      {}\n\
         Event span:             {}\n\
         Total fees earned:      {} msat ({:.3} sat)",
        status.channels,
        status.private_channels,
        status.forwarding_events,
        span,
        status.total_fees_msat,
        status.total_fees_msat as f64 / 1000.0
    ))
}

fn format_time(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| unix_secs.to_string())
}
