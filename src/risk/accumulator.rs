//! Per-interval aggregation of risk and delay.

use super::RiskSample;

/// Sums of per-step samples since the last optimization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntervalAccumulator {
    /// Sum of per-step near-miss counts
    pub near_miss_sum: u64,
    /// Sum of per-step average risk values
    pub risk_sum: f64,
    /// Sum of per-step total waiting time, seconds
    pub delay_sum: f64,
    /// Steps accumulated
    pub step_count: u64,
}

impl IntervalAccumulator {
    /// Adds one step's sample and waiting-time total.
    pub fn add(&mut self, sample: &RiskSample, delay: f64) {
        self.near_miss_sum += sample.near_miss_count;
        self.risk_sum += sample.avg_risk;
        self.delay_sum += delay;
        self.step_count += 1;
    }

    /// Mean of the per-step average risk, 0 for an empty interval.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_risk(&self) -> f64 {
        if self.step_count == 0 {
            0.0
        } else {
            self.risk_sum / self.step_count as f64
        }
    }

    /// Mean per-step waiting time, 0 for an empty interval.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_delay(&self) -> f64 {
        if self.step_count == 0 {
            0.0
        } else {
            self.delay_sum / self.step_count as f64
        }
    }

    /// Clears all sums.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_include_quiet_steps() {
        let mut acc = IntervalAccumulator::default();
        acc.add(
            &RiskSample {
                near_miss_count: 2,
                avg_risk: 1.5,
            },
            10.0,
        );
        acc.add(&RiskSample::default(), 0.0);
        assert_eq!(acc.near_miss_sum, 2);
        assert_eq!(acc.step_count, 2);
        assert!((acc.average_risk() - 0.75).abs() < 1e-12);
        assert!((acc.average_delay() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn empty_interval_averages_zero() {
        let acc = IntervalAccumulator::default();
        assert!(acc.average_risk().abs() < f64::EPSILON);
        assert!(acc.average_delay().abs() < f64::EPSILON);
    }

    #[test]
    fn reset_clears_everything() {
        let mut acc = IntervalAccumulator::default();
        acc.add(
            &RiskSample {
                near_miss_count: 1,
                avg_risk: 1.0,
            },
            3.0,
        );
        acc.reset();
        assert_eq!(acc, IntervalAccumulator::default());
    }
}
