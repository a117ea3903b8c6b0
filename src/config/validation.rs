//! Configuration validation
//!
//! Runs on the fully deserialized [`RunConfig`] after environment overrides
//! are applied. Collects every issue instead of stopping at the first.

use crate::config::schema::{
    DetectorConfig, OptimizerConfig, OutputConfig, RunConfig, SimulationConfig, SyntheticConfig,
};
use crate::error::{Severity, ValidationIssue};

/// Phase count of the bundled synthetic program, used for reachability
/// warnings.
const REFERENCE_PHASES: u32 = 4;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &RunConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_simulation(&config.simulation);
        self.validate_optimizer(&config.optimizer);
        self.validate_detector(&config.detector);
        self.validate_output(&config.output);
        self.validate_synthetic(&config.synthetic);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn validate_simulation(&mut self, sim: &SimulationConfig) {
        if sim.steps == 0 {
            self.add_warning("simulation.steps", "Run has zero steps; nothing will happen");
        }
        if !(sim.step_length.is_finite() && sim.step_length > 0.0) {
            self.add_error("simulation.step_length", "Step length must be a positive number of seconds");
            return;
        }
        match sim.interval_steps() {
            Ok(0) => self.add_error(
                "simulation.optimize_interval",
                "Optimization interval must be at least one step",
            ),
            Ok(n) if n >= sim.steps && sim.steps > 0 => self.add_warning(
                "simulation.optimize_interval",
                "Interval is not shorter than the run; the optimizer will never be called",
            ),
            Ok(_) => {}
            Err(e) => self.add_error("simulation.optimize_interval", &e.to_string()),
        }
    }

    fn validate_optimizer(&mut self, opt: &OptimizerConfig) {
        if opt.cycle_time == 0 {
            self.add_error("optimizer.cycle_time", "Cycle time must be positive");
        }
        if opt.min_phase_duration > opt.max_phase_duration {
            self.add_error(
                "optimizer.min_phase_duration",
                "Minimum phase duration exceeds the maximum",
            );
        }
        if opt.weight_ramp.iter().any(|w| !w.is_finite() || *w < 0.0) {
            self.add_error("optimizer.weight_ramp", "Ramp weights must be finite and non-negative");
        }
        let lowest = REFERENCE_PHASES.saturating_mul(opt.min_phase_duration);
        let highest = REFERENCE_PHASES.saturating_mul(opt.max_phase_duration);
        if opt.cycle_time > 0 && (lowest > opt.cycle_time || highest < opt.cycle_time) {
            self.add_warning(
                "optimizer.cycle_time",
                "Cycle time is not reachable by a four-phase plan within the bounds; \
                 every optimization of such a plan will be skipped",
            );
        }
    }

    fn validate_detector(&mut self, det: &DetectorConfig) {
        if !(det.proximity_threshold.is_finite() && det.proximity_threshold > 0.0) {
            self.add_error("detector.proximity_threshold", "Proximity threshold must be positive");
        }
        if !(det.ttc_threshold.is_finite() && det.ttc_threshold > 0.0) {
            self.add_error("detector.ttc_threshold", "Time-to-collision threshold must be positive");
        }
    }

    fn validate_output(&mut self, out: &OutputConfig) {
        let files = [
            ("output.changes_file", &out.changes_file),
            ("output.observed_file", &out.observed_file),
            ("output.timeline_file", &out.timeline_file),
            ("output.risk_file", &out.risk_file),
        ];
        for (path, name) in files {
            if name.trim().is_empty() {
                self.add_error(path, "File name cannot be empty");
            }
        }
        let mut names: Vec<&str> = files.iter().map(|(_, n)| n.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1] && !w[0].is_empty()) {
            self.add_error("output", "Output file names must be distinct");
        }
    }

    fn validate_synthetic(&mut self, syn: &SyntheticConfig) {
        if !(0.0..=1.0).contains(&syn.arrival_rate) {
            self.add_error("synthetic.arrival_rate", "Arrival rate must be between 0 and 1");
        }
        if syn.signal_id.trim().is_empty() {
            self.add_error("synthetic.signal_id", "Signal id cannot be empty");
        }
        if !(syn.max_speed.is_finite() && syn.max_speed > 0.0) {
            self.add_error("synthetic.max_speed", "Maximum speed must be positive");
        }
        for (i, d) in syn.phase_durations.iter().enumerate() {
            if !(d.is_finite() && *d > 0.0) {
                self.add_error(
                    &format!("synthetic.phase_durations[{i}]"),
                    "Phase durations must be positive",
                );
            }
        }
        if syn.phase_durations.len() != REFERENCE_PHASES as usize {
            self.add_warning(
                "synthetic.phase_durations",
                "The synthetic junction has four phases; missing entries use defaults and extra ones are ignored",
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
