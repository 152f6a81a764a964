use crate::math::stats::StatsHelper;
use crate::model::Severity;

pub const RED_ABOVE: f64 = 4.8;
pub const YELLOW_ABOVE: f64 = 1.2;

/// Severity for a mean duration. Boundaries fall into the lower tier.
pub fn classify(mean_duration: f64) -> Severity {
    if mean_duration > RED_ABOVE {
        Severity::Red
    } else if mean_duration > YELLOW_ABOVE {
        Severity::Yellow
    } else {
        Severity::Green
    }
}

/// Mean duration and severity for a bucket's durations.
pub fn classify_durations(durations: &[f64]) -> (f64, Severity) {
    match StatsHelper::mean(durations) {
        Some(mean) => (mean, classify(mean)),
        None => (0.0, Severity::Green),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_exclusive() {
        assert_eq!(classify(4.8), Severity::Yellow);
        assert_eq!(classify(4.800_001), Severity::Red);
        assert_eq!(classify(1.2), Severity::Green);
        assert_eq!(classify(1.200_001), Severity::Yellow);
        assert_eq!(classify(0.0), Severity::Green);
    }

    #[test]
    fn classify_durations_uses_mean() {
        assert_eq!(classify_durations(&[5.0, 0.5]), (2.75, Severity::Yellow));
        assert_eq!(classify_durations(&[9.0, 7.0]), (8.0, Severity::Red));
        assert_eq!(classify_durations(&[]), (0.0, Severity::Green));
    }
}
