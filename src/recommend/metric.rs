use crate::error::Error;
use crate::insights::ChannelInsight;
use std::fmt;
use std::str::FromStr;

/// The scalar a recommendation pass ranks channels by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Fraction of monitored time the peer was online.
    Uptime,
    /// Fees earned per block of channel age.
    Revenue,
    IncomingVolume,
    OutgoingVolume,
    /// Incoming plus outgoing volume per block of channel age.
    TotalVolume,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Uptime,
        Metric::Revenue,
        Metric::IncomingVolume,
        Metric::OutgoingVolume,
        Metric::TotalVolume,
    ];

    /// Compute this metric for one channel.
    ///
    /// Returns `None` when the denominator is zero (never monitored, or no
    /// confirmations yet); such a channel is excluded from the population.
    pub fn value(self, insight: &ChannelInsight) -> Option<f64> {
        match self {
            Metric::Uptime => {
                if insight.monitored_seconds == 0 {
                    return None;
                }
                Some(insight.uptime_seconds as f64 / insight.monitored_seconds as f64)
            }
            Metric::Revenue => per_block(insight.fees_earned_msat, insight.confirmations),
            Metric::IncomingVolume => per_block(insight.volume_incoming_msat, insight.confirmations),
            Metric::OutgoingVolume => per_block(insight.volume_outgoing_msat, insight.confirmations),
            Metric::TotalVolume => {
                let total = insight
                    .volume_incoming_msat
                    .saturating_add(insight.volume_outgoing_msat);
                per_block(total, insight.confirmations)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Uptime => "UPTIME",
            Metric::Revenue => "REVENUE",
            Metric::IncomingVolume => "INCOMING_VOLUME",
            Metric::OutgoingVolume => "OUTGOING_VOLUME",
            Metric::TotalVolume => "TOTAL_VOLUME",
        }
    }
}

fn per_block(amount_msat: u64, age_blocks: u32) -> Option<f64> {
    if age_blocks == 0 {
        return None;
    }
    Some(amount_msat as f64 / age_blocks as f64)
}

impl FromStr for Metric {
    type Err = Error;

    /// Accepts the RPC names in any case, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase().replace('-', "_");
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == normalised)
            .ok_or_else(|| Error::invalid(format!("unknown metric {:?}", s)))
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::mock::make_insight;

    #[test]
    fn test_uptime_ratio() {
        let ch = make_insight(1, 1000, 900);
        assert!((Metric::Uptime.value(&ch).unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_uptime_excluded_when_never_monitored() {
        let ch = make_insight(1, 0, 0);
        assert_eq!(Metric::Uptime.value(&ch), None);
    }

    #[test]
    fn test_per_block_metrics() {
        let mut ch = make_insight(1, 1000, 1000);
        ch.confirmations = 10;
        ch.fees_earned_msat = 5_000;
        ch.volume_incoming_msat = 1_000_000;
        ch.volume_outgoing_msat = 3_000_000;

        assert_eq!(Metric::Revenue.value(&ch), Some(500.0));
        assert_eq!(Metric::IncomingVolume.value(&ch), Some(100_000.0));
        assert_eq!(Metric::OutgoingVolume.value(&ch), Some(300_000.0));
        assert_eq!(Metric::TotalVolume.value(&ch), Some(400_000.0));
    }

    #[test]
    fn test_per_block_excluded_without_confirmations() {
        let mut ch = make_insight(1, 1000, 1000);
        ch.confirmations = 0;
        ch.fees_earned_msat = 5_000;
        for metric in [
            Metric::Revenue,
            Metric::IncomingVolume,
            Metric::OutgoingVolume,
            Metric::TotalVolume,
        ] {
            assert_eq!(metric.value(&ch), None, "{} should be excluded", metric);
        }
        // Uptime does not depend on age
        assert_eq!(Metric::Uptime.value(&ch), Some(1.0));
    }

    #[test]
    fn test_parse_rpc_names() {
        assert_eq!("UPTIME".parse::<Metric>().unwrap(), Metric::Uptime);
        assert_eq!("revenue".parse::<Metric>().unwrap(), Metric::Revenue);
        assert_eq!("incoming-volume".parse::<Metric>().unwrap(), Metric::IncomingVolume);
        assert_eq!("Outgoing_Volume".parse::<Metric>().unwrap(), Metric::OutgoingVolume);
        assert_eq!("total_volume".parse::<Metric>().unwrap(), Metric::TotalVolume);
    }

    #[test]
    fn test_unknown_metric_is_invalid_argument() {
        let err = "latency".parse::<Metric>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!("".parse::<Metric>().is_err());
    }
}
