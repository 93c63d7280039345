use crate::recommend::{Metric, DEFAULT_OUTLIER_MULTIPLIER};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upper bound on the default revenue look-back, one century
pub const MAX_WINDOW_DAYS: u64 = 36_500;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub revenue: RevenueConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    /// Path to the SQLite database holding insights and forwarding history
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendConfig {
    /// Channels monitored for less than this are not ranked
    #[serde(default = "default_minimum_monitored")]
    pub minimum_monitored_secs: u64,
    /// Metric used when none is given on the command line
    #[serde(default = "default_metric")]
    pub metric: String,
    /// IQR multiplier for outlier recommendations
    #[serde(default = "default_outlier_multiplier")]
    pub outlier_multiplier: f64,
}

#[derive(Debug, Deserialize)]
pub struct RevenueConfig {
    /// Look-back used when no start time is given
    #[serde(default = "default_window_days")]
    pub window_days: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("ldk-insights.db")
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_minimum_monitored() -> u64 {
    7 * 86400
}
fn default_metric() -> String {
    "uptime".to_string()
}
fn default_outlier_multiplier() -> f64 {
    DEFAULT_OUTLIER_MULTIPLIER
}
fn default_window_days() -> u64 {
    30
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            minimum_monitored_secs: default_minimum_monitored(),
            metric: default_metric(),
            outlier_multiplier: default_outlier_multiplier(),
        }
    }
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

impl Config {
    /// Load and validate the config file. A missing file yields defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        parse_log_level(&self.general.log_level)?;
        if !self.recommend.outlier_multiplier.is_finite() || self.recommend.outlier_multiplier <= 0.0 {
            anyhow::bail!(
                "outlier_multiplier ({}) must be a positive number",
                self.recommend.outlier_multiplier
            );
        }
        if let Err(e) = self.recommend.metric.parse::<Metric>() {
            anyhow::bail!("recommend.metric: {}", e);
        }
        if self.revenue.window_days == 0 {
            anyhow::bail!("window_days must be at least 1");
        }
        if self.revenue.window_days > MAX_WINDOW_DAYS {
            anyhow::bail!(
                "window_days ({}) must be at most {}",
                self.revenue.window_days,
                MAX_WINDOW_DAYS
            );
        }
        Ok(())
    }

    pub fn default_metric(&self) -> anyhow::Result<Metric> {
        Ok(self.recommend.metric.parse()?)
    }
}

/// Parse a log level name as accepted in `general.log_level` and `--log-level`.
pub fn parse_log_level(level: &str) -> anyhow::Result<log::LevelFilter> {
    level
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log_level {:?}", level))
}
