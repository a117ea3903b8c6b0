//! Near-miss risk detection
//!
//! Scores each simulation step by the time-to-collision of nearby vehicle
//! pairs and aggregates the scores between optimizations.

pub mod accumulator;
pub mod detector;
pub mod grid;

pub use accumulator::IntervalAccumulator;
pub use detector::{NearMissDetector, RiskSample, ScanReport, VehicleSnapshot};
