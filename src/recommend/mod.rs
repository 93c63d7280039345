pub mod eligibility;
pub mod metric;
pub mod outlier;
pub mod threshold;

pub use metric::Metric;
pub use outlier::{CONSERVATIVE_OUTLIER_MULTIPLIER, DEFAULT_OUTLIER_MULTIPLIER};

use crate::error::{Error, Result};
use crate::insights::{self, ChanPoint, ChannelSnapshotSource};
use log::info;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Parameters shared by both recommendation modes.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    /// Channels watched for less than this are not ranked.
    pub minimum_monitored: Duration,
    pub metric: Metric,
}

#[derive(Debug, Clone)]
pub struct OutlierRequest {
    pub rec: RecommendationRequest,
    /// `None` (or zero, the unset wire value) selects [`DEFAULT_OUTLIER_MULTIPLIER`].
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ThresholdRequest {
    pub rec: RecommendationRequest,
    /// Channels with a metric value strictly below this are flagged.
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub chan_point: ChanPoint,
    pub value: f64,
    pub recommend_close: bool,
}

/// Outcome of one recommendation pass.
///
/// `recommendations` holds exactly one entry per ranked channel, ascending by
/// value; channels with equal values keep their snapshot order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_channels: usize,
    pub considered_channels: usize,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Copy)]
enum Evaluation {
    Outlier { multiplier: f64 },
    Threshold { value: f64 },
}

impl OutlierRequest {
    fn effective_multiplier(&self) -> Result<f64> {
        match self.multiplier {
            None => Ok(DEFAULT_OUTLIER_MULTIPLIER),
            Some(m) if m == 0.0 => Ok(DEFAULT_OUTLIER_MULTIPLIER),
            Some(m) if m.is_finite() && m > 0.0 => Ok(m),
            Some(m) => Err(Error::invalid(format!(
                "outlier multiplier must be positive, got {}",
                m
            ))),
        }
    }
}

/// Flag channels whose metric is a low outlier within the ranked population.
pub async fn outlier_recommendations(
    source: &(impl ChannelSnapshotSource + ?Sized),
    cancel: &CancellationToken,
    req: &OutlierRequest,
) -> Result<Report> {
    let multiplier = req.effective_multiplier()?;
    recommend(source, cancel, &req.rec, Evaluation::Outlier { multiplier }).await
}

/// Flag channels whose metric falls strictly below `req.threshold`.
pub async fn threshold_recommendations(
    source: &(impl ChannelSnapshotSource + ?Sized),
    cancel: &CancellationToken,
    req: &ThresholdRequest,
) -> Result<Report> {
    if !req.threshold.is_finite() {
        return Err(Error::invalid(format!(
            "threshold must be a finite number, got {}",
            req.threshold
        )));
    }
    recommend(
        source,
        cancel,
        &req.rec,
        Evaluation::Threshold {
            value: req.threshold,
        },
    )
    .await
}

async fn recommend(
    source: &(impl ChannelSnapshotSource + ?Sized),
    cancel: &CancellationToken,
    rec: &RecommendationRequest,
    evaluation: Evaluation,
) -> Result<Report> {
    let channels = insights::fetch_snapshot(source, cancel).await?;
    let report = build_report(&channels, rec, evaluation);

    info!(
        "{} recommendations ({:?}): {} of {} channels considered, {} flagged",
        rec.metric,
        evaluation,
        report.considered_channels,
        report.total_channels,
        report.recommendations.iter().filter(|r| r.recommend_close).count()
    );

    Ok(report)
}

fn build_report(
    channels: &[insights::ChannelInsight],
    rec: &RecommendationRequest,
    evaluation: Evaluation,
) -> Report {
    let eligible = eligibility::eligible_channels(channels, rec.minimum_monitored, rec.metric);

    let flags = match evaluation {
        Evaluation::Outlier { multiplier } => outlier::flag_outliers(&eligible, multiplier),
        Evaluation::Threshold { value } => threshold::flag_below_threshold(&eligible, value),
    };

    let mut recommendations: Vec<Recommendation> = eligible
        .iter()
        .zip(flags)
        .map(|(ch, recommend_close)| Recommendation {
            chan_point: ch.insight.chan_point.clone(),
            value: ch.value,
            recommend_close,
        })
        .collect();

    // Stable: equal values keep snapshot order.
    recommendations.sort_by(|a, b| a.value.total_cmp(&b.value));

    Report {
        total_channels: channels.len(),
        considered_channels: eligible.len(),
        recommendations,
    }
}
