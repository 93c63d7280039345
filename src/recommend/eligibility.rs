use crate::insights::ChannelInsight;
use crate::recommend::metric::Metric;
use log::debug;
use std::time::Duration;

/// A channel that qualified for ranking, with its metric value.
#[derive(Debug, Clone)]
pub struct EligibleChannel<'a> {
    pub insight: &'a ChannelInsight,
    pub value: f64,
}

/// Private channels and channels watched for less than `minimum_monitored`
/// are not ranked.
pub fn is_eligible(insight: &ChannelInsight, minimum_monitored: Duration) -> bool {
    !insight.private && insight.monitored_seconds >= minimum_monitored.as_secs()
}

/// Build the ranked population, preserving input order.
///
/// A channel must pass [`is_eligible`] and have a defined metric value.
pub fn eligible_channels(
    channels: &[ChannelInsight],
    minimum_monitored: Duration,
    metric: Metric,
) -> Vec<EligibleChannel<'_>> {
    channels
        .iter()
        .filter_map(|ch| {
            if !is_eligible(ch, minimum_monitored) {
                debug!(
                    "Skipping {}: private={} monitored={}s (minimum {}s)",
                    ch.chan_point,
                    ch.private,
                    ch.monitored_seconds,
                    minimum_monitored.as_secs()
                );
                return None;
            }
            match metric.value(ch) {
                Some(value) => Some(EligibleChannel { insight: ch, value }),
                None => {
                    debug!("Skipping {}: {} undefined", ch.chan_point, metric);
                    None
                }
            }
        })
        .collect()
}
