use crate::recommend::eligibility::EligibleChannel;

/// A channel strictly below the caller's floor is a close candidate.
pub fn flag(value: f64, threshold: f64) -> bool {
    value < threshold
}

pub fn flag_below_threshold(channels: &[EligibleChannel<'_>], threshold: f64) -> Vec<bool> {
    channels.iter().map(|c| flag(c.value, threshold)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::mock::make_insight;

    #[test]
    fn test_strictly_below() {
        assert!(flag(0.9, 0.95));
        assert!(!flag(0.95, 0.95));
        assert!(!flag(1.0, 0.95));
    }

    #[test]
    fn test_raising_threshold_never_unflags() {
        let insights: Vec<_> = (1..=4).map(|n| make_insight(n, 1, 1)).collect();
        let channels: Vec<_> = insights
            .iter()
            .zip([0.1, 0.5, 0.5, 0.9])
            .map(|(insight, value)| EligibleChannel { insight, value })
            .collect();

        let mut previous = flag_below_threshold(&channels, 0.0);
        assert!(previous.iter().all(|f| !f));
        for threshold in [0.1, 0.3, 0.5, 0.51, 0.9, 2.0] {
            let flags = flag_below_threshold(&channels, threshold);
            for (now, before) in flags.iter().zip(&previous) {
                assert!(*now || !before, "threshold {} removed a flag", threshold);
            }
            previous = flags;
        }
        assert!(previous.iter().all(|f| *f));
    }
}
