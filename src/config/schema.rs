//! Configuration schema types
//!
//! Every section and field is optional in the YAML file; omitted values
//! take the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a control-loop run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Run length and optimization cadence
    pub simulation: SimulationConfig,

    /// Phase-duration optimizer bounds and weights
    pub optimizer: OptimizerConfig,

    /// Near-miss detector thresholds
    pub detector: DetectorConfig,

    /// Output artifact locations
    pub output: OutputConfig,

    /// Bundled synthetic environment parameters
    pub synthetic: SyntheticConfig,
}

// ============================================================================
// Simulation
// ============================================================================

/// Run length and optimization cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of simulation steps to run
    pub steps: u64,

    /// Seconds of simulated time per step
    pub step_length: f64,

    /// Steps between optimizer calls (`300`) or a duration (`"5m"`)
    pub optimize_interval: IntervalSpec,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 3600,
            step_length: 1.0,
            optimize_interval: IntervalSpec::Steps(300),
        }
    }
}

impl SimulationConfig {
    /// Optimization interval in steps.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a duration string does not
    /// parse or the step length is not positive.
    pub fn interval_steps(&self) -> Result<u64, ConfigError> {
        self.optimize_interval.to_steps(self.step_length)
    }
}

/// Optimization interval, either a raw step count or a human duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalSpec {
    /// Number of steps
    Steps(u64),
    /// Duration such as `"5m"` or `"90s"`
    Duration(String),
}

impl IntervalSpec {
    /// Converts the interval to a step count for the given step length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a duration string does not
    /// parse or the step length is not positive.
    pub fn to_steps(&self, step_length: f64) -> Result<u64, ConfigError> {
        match self {
            Self::Steps(n) => Ok(*n),
            Self::Duration(raw) => {
                let parsed: Duration =
                    humantime::parse_duration(raw.trim()).map_err(|e| {
                        ConfigError::InvalidValue {
                            field: "simulation.optimize_interval".to_string(),
                            value: raw.clone(),
                            expected: format!("a step count or duration like \"5m\" ({e})"),
                        }
                    })?;
                if !(step_length.is_finite() && step_length > 0.0) {
                    return Err(ConfigError::InvalidValue {
                        field: "simulation.step_length".to_string(),
                        value: step_length.to_string(),
                        expected: "a positive number of seconds".to_string(),
                    });
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let steps = (parsed.as_secs_f64() / step_length).round() as u64;
                Ok(steps)
            }
        }
    }
}

// ============================================================================
// Optimizer
// ============================================================================

/// Phase-duration bounds and objective weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Shortest allowed phase, seconds
    pub min_phase_duration: u32,

    /// Longest allowed phase, seconds
    pub max_phase_duration: u32,

    /// Total cycle time every committed plan must sum to, seconds
    pub cycle_time: u32,

    /// Congestion weight of the first and last phase; phases in between
    /// are interpolated linearly
    pub weight_ramp: [f64; 2],
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_phase_duration: 5,
            max_phase_duration: 60,
            cycle_time: 120,
            weight_ramp: [1.0, 1.5],
        }
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Near-miss detector thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfig {
    /// Pairs farther apart than this (metres) are never compared
    pub proximity_threshold: f64,

    /// Time-to-collision below which a pair counts as a near miss, seconds
    pub ttc_threshold: f64,

    /// Pair enumeration strategy
    pub scan: ScanStrategy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 50.0,
            ttc_threshold: 2.0,
            scan: ScanStrategy::Pairwise,
        }
    }
}

/// How candidate vehicle pairs are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Every unordered pair
    #[default]
    Pairwise,
    /// Same and adjacent grid cells only
    Grid,
}

// ============================================================================
// Output
// ============================================================================

/// Output artifact locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory all artifacts are written to
    pub dir: PathBuf,

    /// Requested vs applied durations per optimization
    pub changes_file: String,

    /// Observed phase switches
    pub observed_file: String,

    /// Derived state timeline
    pub timeline_file: String,

    /// Per-step average risk
    pub risk_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
            changes_file: "tls_changes.csv".to_string(),
            observed_file: "tls_observed.csv".to_string(),
            timeline_file: "timeline.jsonl".to_string(),
            risk_file: "risk_trend.csv".to_string(),
        }
    }
}

impl OutputConfig {
    /// Full path of the change log.
    #[must_use]
    pub fn changes_path(&self) -> PathBuf {
        self.dir.join(&self.changes_file)
    }

    /// Full path of the observation log.
    #[must_use]
    pub fn observed_path(&self) -> PathBuf {
        self.dir.join(&self.observed_file)
    }

    /// Full path of the derived timeline.
    #[must_use]
    pub fn timeline_path(&self) -> PathBuf {
        self.dir.join(&self.timeline_file)
    }

    /// Full path of the risk trend.
    #[must_use]
    pub fn risk_path(&self) -> PathBuf {
        self.dir.join(&self.risk_file)
    }
}

// ============================================================================
// Synthetic Environment
// ============================================================================

/// Parameters of the bundled synthetic environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// RNG seed; equal seeds give identical runs
    pub seed: u64,

    /// Probability of a vehicle arriving on each approach per step
    pub arrival_rate: f64,

    /// Id of the single signal
    pub signal_id: String,

    /// Durations of the initial four-phase fixed-time program
    pub phase_durations: Vec<f64>,

    /// Free-flow speed, m/s
    pub max_speed: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            arrival_rate: 0.25,
            signal_id: "J0".to_string(),
            phase_durations: vec![42.0, 3.0, 42.0, 3.0],
            max_speed: 13.9,
        }
    }
}
