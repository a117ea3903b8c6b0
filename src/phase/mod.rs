//! Observed phase durations
//!
//! The optimizer sets nominal durations; what the controller actually runs
//! can differ. [`PhaseTracker`] measures each phase from switch to switch and
//! buckets the measurements by optimization epoch.

pub mod stats;
pub mod tracker;

pub use stats::{DurationStat, EpochSummary, PhaseAverage, PhaseSummary, epoch_label};
pub use tracker::{ObservedPhaseEvent, PhaseTracker, UNKNOWN_STATE};
