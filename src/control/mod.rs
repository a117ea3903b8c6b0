//! Control loop
//!
//! Advances the simulation one step at a time, feeds the near-miss detector
//! and the phase tracker every step, and calls the optimizer once per
//! interval. Per-step faults are absorbed here; only a failed step ends a
//! run early.

pub mod runner;
pub mod shutdown;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use runner::{ControlLoop, RunReport};
pub use shutdown::Shutdown;

/// Whether the optimizer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Retime the signal every interval
    #[default]
    Opt,
    /// Observe only; the signal keeps its original program
    Baseline,
}

impl RunMode {
    /// Returns `true` if the optimizer is called.
    #[must_use]
    pub const fn optimizes(self) -> bool {
        matches!(self, Self::Opt)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Opt => "opt",
            Self::Baseline => "baseline",
        })
    }
}

/// Length and cadence of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Steps to run
    pub steps: u64,
    /// Steps between optimizer calls; 0 disables optimization
    pub optimize_interval: u64,
    /// Optimization or baseline
    pub mode: RunMode,
}

impl LoopSettings {
    /// Returns `true` if the optimizer should run after `step`.
    ///
    /// Step 0 never triggers, so the first interval always sees the
    /// signal's original program.
    #[must_use]
    pub const fn optimizes_at(&self, step: u64) -> bool {
        self.mode.optimizes()
            && self.optimize_interval > 0
            && step > 0
            && step % self.optimize_interval == 0
    }
}
