//! Phase-duration optimization
//!
//! Turns an interval's aggregated risk into a new phase plan:
//!
//! 1. Read the signal's active program ([`crate::sim::active_logic`]).
//! 2. Build the linear [`objective::Objective`] and hand its coefficients to
//!    a [`PhaseSolver`].
//! 3. Round the solution to whole seconds with [`repair::repair_rounding`].
//! 4. Push the plan under a freshly minted program id
//!    ([`commit::commit_plan`]) and advance the epoch.
//!
//! A solver that reports anything but an optimal point leaves the signal
//! untouched.

pub mod commit;
pub mod objective;
pub mod repair;
pub mod solver;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::OptimizerConfig;
use crate::error::OptimizeError;
use crate::sim::{SignalController, SignalId, active_logic};

pub use objective::Objective;
pub use repair::repair_rounding;
pub use solver::{Bounds, GreedyBoxSolver, PhaseSolver, SolveStatus};

// ============================================================================
// State
// ============================================================================

/// Counters that outlive a single optimization.
///
/// Owned by the control loop. Program ids are never reused, even when a
/// commit fails after the id was minted.
#[derive(Debug, Clone, Default)]
pub struct OptimizerState {
    program_seq: u64,
    epoch: u32,
}

impl OptimizerState {
    /// Fresh state: epoch 0, no programs minted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch.
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Number of program ids minted so far.
    #[must_use]
    pub const fn programs_minted(&self) -> u64 {
        self.program_seq
    }

    /// Returns the next program id (`opt_1`, `opt_2`, ...).
    pub fn mint_program_id(&mut self) -> String {
        self.program_seq += 1;
        format!("opt_{}", self.program_seq)
    }

    fn advance_epoch(&mut self) -> u32 {
        self.epoch += 1;
        self.epoch
    }
}

// ============================================================================
// Inputs and Outputs
// ============================================================================

/// Aggregated signals for one optimization interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OptimizationInput {
    /// Near misses summed over the interval
    pub near_miss_count: u64,
    /// Mean per-step average risk over the interval
    pub avg_risk: f64,
}

/// A committed plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    /// Durations the optimizer asked for
    pub requested_durations: Vec<u32>,
    /// Durations read back from the controller's active program
    pub applied_durations: Vec<f64>,
    /// Id the plan was committed under
    pub program_id: String,
    /// Epoch that started with this plan
    pub epoch: u32,
    /// Objective value at the requested durations
    pub objective: f64,
}

/// What an optimization call did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A new plan was committed and the epoch advanced
    Committed(OptimizationResult),
    /// The solver found no optimal plan; the signal was left as it was
    Unchanged {
        /// Durations of the plan still in force
        durations: Vec<f64>,
        /// Solver status name
        status: &'static str,
    },
}

// ============================================================================
// Optimizer
// ============================================================================

/// Recomputes phase splits under cycle-time and bound constraints.
pub struct PhaseOptimizer {
    config: OptimizerConfig,
    solver: Box<dyn PhaseSolver>,
}

impl std::fmt::Debug for PhaseOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseOptimizer")
            .field("config", &self.config)
            .field("solver", &self.solver.name())
            .finish()
    }
}

impl PhaseOptimizer {
    /// Creates an optimizer using the bundled [`GreedyBoxSolver`].
    #[must_use]
    pub fn new(config: OptimizerConfig) -> Self {
        Self::with_solver(config, Box::new(GreedyBoxSolver))
    }

    /// Creates an optimizer using a custom solver.
    #[must_use]
    pub fn with_solver(config: OptimizerConfig, solver: Box<dyn PhaseSolver>) -> Self {
        Self { config, solver }
    }

    /// Optimizer configuration.
    #[must_use]
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    fn bounds(&self) -> Bounds {
        Bounds {
            min: f64::from(self.config.min_phase_duration),
            max: f64::from(self.config.max_phase_duration),
            total: f64::from(self.config.cycle_time),
        }
    }

    /// Computes, repairs and commits a new plan for `signal`.
    ///
    /// # Errors
    ///
    /// - [`OptimizeError::Plan`] if the active program cannot be read
    /// - [`OptimizeError::ShapeMismatch`] if the solver returns the wrong
    ///   number of durations
    /// - [`OptimizeError::Infeasible`] if rounding cannot be repaired
    /// - [`OptimizeError::Commit`] if the controller rejects the program
    ///
    /// The epoch only advances on `Ok(Outcome::Committed(_))`.
    pub fn optimize<C: SignalController + ?Sized>(
        &self,
        state: &mut OptimizerState,
        ctl: &mut C,
        signal: &SignalId,
        input: OptimizationInput,
    ) -> Result<Outcome, OptimizeError> {
        let current = active_logic(&*ctl, signal)?;
        let objective = Objective::build(
            current.phases.len(),
            self.config.weight_ramp,
            input.avg_risk,
            input.near_miss_count,
        );

        let raw = match self.solver.solve(&objective.coefficients(), &self.bounds()) {
            SolveStatus::Optimal(raw) => raw,
            status => {
                warn!(
                    signal = %signal,
                    solver = self.solver.name(),
                    status = status.as_str(),
                    phases = current.phases.len(),
                    "optimization failed; keeping current durations"
                );
                return Ok(Outcome::Unchanged {
                    durations: current.durations(),
                    status: status.as_str(),
                });
            }
        };
        if raw.len() != current.phases.len() {
            return Err(OptimizeError::ShapeMismatch {
                expected: current.phases.len(),
                got: raw.len(),
            });
        }

        let requested = repair_rounding(
            &raw,
            self.config.min_phase_duration,
            self.config.max_phase_duration,
            self.config.cycle_time,
        )?;

        let program_id = state.mint_program_id();
        let logic = commit::pinned_logic(&current, &requested, &program_id);
        commit::commit_plan(ctl, signal, logic)?;

        let applied_durations = match active_logic(&*ctl, signal) {
            Ok(logic) => logic.durations(),
            Err(e) => {
                warn!(signal = %signal, error = %e, "could not read back applied durations");
                Vec::new()
            }
        };
        let epoch = state.advance_epoch();
        let objective = objective.evaluate(&requested.iter().map(|&d| f64::from(d)).collect::<Vec<_>>());

        info!(
            signal = %signal,
            program = %program_id,
            ?requested,
            ?applied_durations,
            epoch,
            "phase plan committed"
        );

        Ok(Outcome::Committed(OptimizationResult {
            requested_durations: requested,
            applied_durations,
            program_id,
            epoch,
            objective,
        }))
    }
}
