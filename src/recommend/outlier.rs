//! Inter-quartile range outlier detection.
//!
//! Algorithm:
//! 1. Sort the population's metric values ascending
//! 2. Q1, Q3 by linear interpolation between closest ranks (R type 7)
//! 3. lower_bound = Q1 - multiplier * (Q3 - Q1)
//! 4. A channel is flagged iff its value < lower_bound
//!
//! Only low outliers are flagged: an unusually good channel is never a
//! close candidate. Small populations go through the same arithmetic.

use crate::recommend::eligibility::EligibleChannel;
use log::debug;

/// Flags more channels.
pub const DEFAULT_OUTLIER_MULTIPLIER: f64 = 1.5;
/// Flags only extreme underperformers.
pub const CONSERVATIVE_OUTLIER_MULTIPLIER: f64 = 3.0;

/// Quantile `p` of an ascending slice, interpolating linearly between the
/// two closest ranks. Returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Lower fence `Q1 - multiplier * IQR` for a population of values.
pub fn lower_bound(values: &[f64], multiplier: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let bound = q1 - multiplier * iqr;

    debug!(
        "Outliers: n={} q1={:.6} q3={:.6} iqr={:.6} lower_bound={:.6}",
        sorted.len(),
        q1,
        q3,
        iqr,
        bound
    );

    Some(bound)
}

/// One flag per channel, in input order.
pub fn flag_outliers(channels: &[EligibleChannel<'_>], multiplier: f64) -> Vec<bool> {
    let values: Vec<f64> = channels.iter().map(|c| c.value).collect();
    match lower_bound(&values, multiplier) {
        Some(bound) => values.iter().map(|&v| v < bound).collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::mock::make_insight;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [10.0, 20.0, 1000.0];
        assert!(approx(quantile(&sorted, 0.25).unwrap(), 15.0));
        assert!(approx(quantile(&sorted, 0.5).unwrap(), 20.0));
        assert!(approx(quantile(&sorted, 0.75).unwrap(), 510.0));
    }

    #[test]
    fn test_quantile_edges() {
        assert_eq!(quantile(&[], 0.25), None);
        assert_eq!(quantile(&[7.0], 0.25), Some(7.0));
        assert_eq!(quantile(&[7.0], 0.75), Some(7.0));
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.0), Some(1.0));
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 1.0), Some(4.0));
        assert!(approx(quantile(&[1.0, 2.0, 3.0, 4.0], 0.25).unwrap(), 1.75));
    }

    #[test]
    fn test_lower_bound_sorts_input() {
        let bound = lower_bound(&[1000.0, 10.0, 20.0], 1.5).unwrap();
        assert!(approx(bound, -727.5), "bound = {}", bound);
    }

    #[test]
    fn test_high_outlier_not_flagged() {
        let insights: Vec<_> = (1..=3).map(|n| make_insight(n, 1, 1)).collect();
        let channels: Vec<_> = insights
            .iter()
            .zip([10.0, 20.0, 1000.0])
            .map(|(insight, value)| EligibleChannel { insight, value })
            .collect();
        assert_eq!(flag_outliers(&channels, 1.5), vec![false, false, false]);
    }

    #[test]
    fn test_low_outlier_flagged() {
        let values = [0.0, 0.95, 0.96, 0.97, 0.98, 0.99, 1.0];
        let insights: Vec<_> = (1..=values.len() as u32).map(|n| make_insight(n, 1, 1)).collect();
        let channels: Vec<_> = insights
            .iter()
            .zip(values)
            .map(|(insight, value)| EligibleChannel { insight, value })
            .collect();
        let flags = flag_outliers(&channels, 1.5);
        assert_eq!(flags, vec![true, false, false, false, false, false, false]);
    }

    #[test]
    fn test_single_channel_never_flagged() {
        let insight = make_insight(1, 1, 1);
        let channels = vec![EligibleChannel { insight: &insight, value: 0.0 }];
        assert_eq!(flag_outliers(&channels, 1.5), vec![false]);
    }

    #[test]
    fn test_empty_population() {
        assert!(flag_outliers(&[], 1.5).is_empty());
    }

    #[test]
    fn test_larger_multiplier_flags_subset() {
        let values = [0.0, 0.2, 0.6, 0.9, 0.92, 0.94, 0.96, 0.98, 1.0];
        let insights: Vec<_> = (1..=values.len() as u32).map(|n| make_insight(n, 1, 1)).collect();
        let channels: Vec<_> = insights
            .iter()
            .zip(values)
            .map(|(insight, value)| EligibleChannel { insight, value })
            .collect();

        let mut previous = flag_outliers(&channels, 0.1);
        for multiplier in [0.5, 1.0, 1.5, 3.0, 10.0] {
            let flags = flag_outliers(&channels, multiplier);
            for (now, before) in flags.iter().zip(&previous) {
                assert!(!now || *before, "multiplier {} added a flag", multiplier);
            }
            previous = flags;
        }
    }
}
