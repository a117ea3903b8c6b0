//! Observed-duration statistics.

use std::collections::BTreeMap;

use serde::Serialize;

/// Running sum and count of observed durations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DurationStat {
    /// Sum of observed durations, seconds
    pub sum: f64,
    /// Number of observations
    pub count: u64,
}

impl DurationStat {
    /// Adds one observation.
    pub fn record(&mut self, duration: f64) {
        self.sum += duration;
        self.count += 1;
    }

    /// Mean duration, 0 when nothing has been recorded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        self.sum / self.count.max(1) as f64
    }
}

/// Per-phase statistics keyed by phase index.
pub type PhaseStats = BTreeMap<usize, DurationStat>;

/// Human label for an epoch.
#[must_use]
pub fn epoch_label(epoch: u32) -> String {
    if epoch == 0 {
        "before first optimization".to_string()
    } else {
        format!("after optimization #{epoch}")
    }
}

/// Average duration of one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseAverage {
    /// Phase index
    pub phase_index: usize,
    /// Mean observed duration rounded to centiseconds
    pub average: f64,
    /// Number of completed observations
    pub switches: u64,
}

/// Per-phase averages within one epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochSummary {
    /// Epoch number
    pub epoch: u32,
    /// Label such as `"after optimization #2"`
    pub label: String,
    /// Averages in phase order
    pub phases: Vec<PhaseAverage>,
}

/// Observed phase durations across the whole run and per epoch.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PhaseSummary {
    /// Averages over every epoch
    pub global: Vec<PhaseAverage>,
    /// Averages per epoch in epoch order
    pub epochs: Vec<EpochSummary>,
}

impl PhaseSummary {
    /// Returns `true` if no phase switch was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}

pub(crate) fn averages(stats: &PhaseStats) -> Vec<PhaseAverage> {
    stats
        .iter()
        .map(|(&phase_index, stat)| PhaseAverage {
            phase_index,
            average: round2(stat.mean()),
            switches: stat.count,
        })
        .collect()
}

/// Rounds to two decimal places.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl std::fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Not enough observations to compute phase durations.");
        }
        writeln!(f, "Observed phase durations (avg by phase index):")?;
        for p in &self.global {
            writeln!(
                f,
                "  phase {}: {}s over {} switches",
                p.phase_index, p.average, p.switches
            )?;
        }
        writeln!(f, "Observed phase durations per epoch (avg by phase index):")?;
        for epoch in &self.epochs {
            writeln!(f, "  Epoch {} ({}):", epoch.epoch, epoch.label)?;
            for p in &epoch.phases {
                writeln!(
                    f,
                    "    phase {}: {}s over {} switches",
                    p.phase_index, p.average, p.switches
                )?;
            }
        }
        Ok(())
    }
}
