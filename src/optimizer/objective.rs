//! Linear objective over phase durations.

/// `0.5 * Σ wᵢdᵢ + 0.5 * Σ rᵢdᵢ + near_miss_count`
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    /// Congestion weight per phase
    pub delay_weights: Vec<f64>,
    /// Risk coefficient per phase
    pub risk_weights: Vec<f64>,
    /// Constant term
    pub constant: f64,
}

impl Objective {
    /// Builds the objective for a plan of `phases` phases.
    ///
    /// Congestion weights ramp linearly between the two `ramp` endpoints.
    /// The interval's average risk is applied uniformly to every phase.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn build(phases: usize, ramp: [f64; 2], avg_risk: f64, near_miss_count: u64) -> Self {
        Self {
            delay_weights: linspace(ramp[0], ramp[1], phases),
            risk_weights: vec![avg_risk; phases],
            constant: near_miss_count as f64,
        }
    }

    /// Number of phases the objective covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.delay_weights.len()
    }

    /// Returns `true` for a zero-phase objective.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delay_weights.is_empty()
    }

    /// Combined per-phase coefficient of the linear term.
    #[must_use]
    pub fn coefficients(&self) -> Vec<f64> {
        self.delay_weights
            .iter()
            .zip(&self.risk_weights)
            .map(|(w, r)| 0.5 * w + 0.5 * r)
            .collect()
    }

    /// Objective value at `durations`.
    #[must_use]
    pub fn evaluate(&self, durations: &[f64]) -> f64 {
        self.coefficients()
            .iter()
            .zip(durations)
            .map(|(c, d)| c * d)
            .sum::<f64>()
            + self.constant
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
