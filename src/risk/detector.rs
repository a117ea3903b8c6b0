//! Time-to-collision near-miss detection.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{DetectorConfig, ScanStrategy};
use crate::sim::{Position, VehicleSource};

use super::grid;

/// One vehicle's state for a single step.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    /// Vehicle identifier
    pub id: String,
    /// Position in metres
    pub position: Position,
    /// Speed in m/s
    pub speed: f64,
}

impl VehicleSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(id: impl Into<String>, x: f64, y: f64, speed: f64) -> Self {
        Self {
            id: id.into(),
            position: Position::new(x, y),
            speed,
        }
    }
}

/// Near-miss statistics for one step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskSample {
    /// Number of qualifying vehicle pairs
    pub near_miss_count: u64,
    /// Mean time-to-collision over qualifying pairs, 0 when none qualified
    pub avg_risk: f64,
}

/// Result of scanning a vehicle source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScanReport {
    /// Risk statistics over the vehicles that could be read
    pub sample: RiskSample,
    /// Vehicles included in the computation
    pub vehicles: usize,
    /// Vehicles excluded because a query failed
    pub skipped: usize,
}

/// Pairwise time-to-collision detector.
#[derive(Debug, Clone)]
pub struct NearMissDetector {
    proximity_threshold: f64,
    ttc_threshold: f64,
    strategy: ScanStrategy,
}

impl Default for NearMissDetector {
    fn default() -> Self {
        Self::new(&DetectorConfig::default())
    }
}

impl NearMissDetector {
    /// Creates a detector from configuration.
    #[must_use]
    pub const fn new(config: &DetectorConfig) -> Self {
        Self {
            proximity_threshold: config.proximity_threshold,
            ttc_threshold: config.ttc_threshold,
            strategy: config.scan,
        }
    }

    /// Returns a copy of the detector using the given scan strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ScanStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Distance beyond which pairs are not compared.
    #[must_use]
    pub const fn proximity_threshold(&self) -> f64 {
        self.proximity_threshold
    }

    /// Reads every vehicle from `source` and assesses the step.
    ///
    /// A vehicle whose position or speed cannot be read is left out of this
    /// step. If the vehicle list itself is unavailable the step is scored as
    /// empty.
    pub fn scan<V: VehicleSource + ?Sized>(&self, source: &V) -> ScanReport {
        let ids = match source.vehicle_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "vehicle list unavailable; scoring step as empty");
                return ScanReport::default();
            }
        };

        let mut skipped = 0;
        let mut vehicles = Vec::with_capacity(ids.len());
        for id in ids {
            let read = source
                .vehicle_position(&id)
                .and_then(|position| source.vehicle_speed(&id).map(|speed| (position, speed)));
            match read {
                Ok((position, speed)) => vehicles.push(VehicleSnapshot {
                    id,
                    position,
                    speed,
                }),
                Err(e) => {
                    debug!(vehicle = %id, error = %e, "excluding vehicle from risk scan");
                    skipped += 1;
                }
            }
        }

        ScanReport {
            sample: self.assess(&vehicles),
            vehicles: vehicles.len(),
            skipped,
        }
    }

    /// Scores one step's vehicle snapshots.
    #[must_use]
    pub fn assess(&self, vehicles: &[VehicleSnapshot]) -> RiskSample {
        let mut count = 0u64;
        let mut risk_sum = 0.0;
        let mut visit = |a: &VehicleSnapshot, b: &VehicleSnapshot| {
            if let Some(ttc) = self.time_to_collision(a, b) {
                count += 1;
                risk_sum += ttc;
            }
        };

        match self.strategy {
            ScanStrategy::Grid if grid::usable_cell_size(self.proximity_threshold) => {
                grid::for_each_candidate_pair(vehicles, self.proximity_threshold, &mut visit);
            }
            _ => {
                for (i, a) in vehicles.iter().enumerate() {
                    for b in &vehicles[i + 1..] {
                        visit(a, b);
                    }
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let avg_risk = if count == 0 {
            0.0
        } else {
            risk_sum / count as f64
        };
        RiskSample {
            near_miss_count: count,
            avg_risk,
        }
    }

    /// Time to collision of a pair, if it qualifies as a near miss.
    ///
    /// Pairs farther apart than the proximity threshold never qualify.
    #[must_use]
    pub fn time_to_collision(&self, a: &VehicleSnapshot, b: &VehicleSnapshot) -> Option<f64> {
        let distance = a.position.distance(&b.position);
        if distance > self.proximity_threshold {
            return None;
        }
        let relative_speed = (a.speed - b.speed).abs();
        if relative_speed <= 0.0 {
            return None;
        }
        let ttc = distance / relative_speed;
        (ttc < self.ttc_threshold).then_some(ttc)
    }
}
