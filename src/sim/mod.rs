//! Simulation environment interface
//!
//! The control loop talks to the traffic simulator only through the traits
//! in this module. Every call is blocking and returns a [`SimError`] on
//! failure; callers decide per operation whether a failure is transient or
//! fatal.
//!
//! - [`VehicleSource`]: per-vehicle telemetry
//! - [`SignalController`]: signal program inspection and replacement
//! - [`SimulationEnvironment`]: clock and step advancement on top of both
//! - [`synthetic::SyntheticEnvironment`]: bundled deterministic environment

pub mod ids;
pub mod synthetic;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

pub use ids::SignalId;
pub use synthetic::SyntheticEnvironment;

/// 2D position in simulation coordinates (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Position {
    /// Creates a position from its coordinates.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// One phase of a signal program as the controller stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPhase {
    /// Nominal duration in seconds
    pub duration: f64,
    /// Lower bound the controller may shorten the phase to
    pub min_duration: f64,
    /// Upper bound the controller may extend the phase to
    pub max_duration: f64,
    /// Signal-color string, one character per controlled link
    pub state: String,
    /// Optional human-readable name
    #[serde(default)]
    pub name: String,
}

impl SignalPhase {
    /// Creates a fixed-time phase where all three durations coincide.
    #[must_use]
    pub fn fixed(duration: f64, state: impl Into<String>) -> Self {
        Self {
            duration,
            min_duration: duration,
            max_duration: duration,
            state: state.into(),
            name: String::new(),
        }
    }
}

/// Kind of signal program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicKind {
    /// Fixed-time program
    #[default]
    Static,
    /// Vehicle-actuated program
    Actuated,
}

/// A complete signal program definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramLogic {
    /// Program identifier, unique per signal
    pub program_id: String,
    /// Program kind
    pub kind: LogicKind,
    /// Phase index the program starts in
    pub current_phase_index: usize,
    /// Ordered phases
    pub phases: Vec<SignalPhase>,
}

impl ProgramLogic {
    /// Nominal phase durations in order.
    #[must_use]
    pub fn durations(&self) -> Vec<f64> {
        self.phases.iter().map(|p| p.duration).collect()
    }

    /// Sum of nominal phase durations.
    #[must_use]
    pub fn cycle_time(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }
}

/// Per-vehicle telemetry.
pub trait VehicleSource {
    /// Identifiers of all vehicles currently in the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the vehicle list cannot be queried.
    fn vehicle_ids(&self) -> Result<Vec<String>, SimError>;

    /// Current position of a vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::VehicleAccess`] if the vehicle cannot be queried.
    fn vehicle_position(&self, id: &str) -> Result<Position, SimError>;

    /// Current speed of a vehicle in m/s.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::VehicleAccess`] if the vehicle cannot be queried.
    fn vehicle_speed(&self, id: &str) -> Result<f64, SimError>;

    /// Seconds the vehicle has been standing since it last moved.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::VehicleAccess`] if the vehicle cannot be queried.
    fn vehicle_waiting_time(&self, id: &str) -> Result<f64, SimError>;
}

/// Signal program inspection and control.
#[allow(clippy::missing_errors_doc)]
pub trait SignalController {
    /// Identifiers of all traffic signals.
    fn signal_ids(&self) -> Result<Vec<SignalId>, SimError>;

    /// Identifier of the active program.
    fn program(&self, signal: &SignalId) -> Result<String, SimError>;

    /// Activates a program that was previously defined.
    fn set_program(&mut self, signal: &SignalId, program_id: &str) -> Result<(), SimError>;

    /// Index of the active phase within the active program.
    fn phase(&self, signal: &SignalId) -> Result<usize, SimError>;

    /// Jumps to the given phase of the active program.
    fn set_phase(&mut self, signal: &SignalId, index: usize) -> Result<(), SimError>;

    /// Current signal-color string.
    fn signal_state(&self, signal: &SignalId) -> Result<String, SimError>;

    /// All program definitions known for the signal.
    fn program_logics(&self, signal: &SignalId) -> Result<Vec<ProgramLogic>, SimError>;

    /// Seconds since the last phase switch.
    fn time_since_last_switch(&self, signal: &SignalId) -> Result<f64, SimError>;

    /// Defines or replaces a program. Does not activate it.
    fn set_program_logic(&mut self, signal: &SignalId, logic: ProgramLogic)
    -> Result<(), SimError>;

    /// Lanes controlled by the signal.
    fn controlled_lanes(&self, signal: &SignalId) -> Result<Vec<String>, SimError>;
}

/// A steppable simulation exposing vehicles and signals.
pub trait SimulationEnvironment: VehicleSource + SignalController {
    /// Advances the simulation by one step.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::StepFailed`] if the simulation cannot continue.
    fn step(&mut self) -> Result<(), SimError>;

    /// Current simulation time in seconds.
    fn time(&self) -> f64;

    /// Releases the environment. The default does nothing.
    fn close(&mut self) {}
}

/// Returns the definition of the signal's active program.
///
/// Falls back to the first known program when no definition matches the
/// active id.
///
/// # Errors
///
/// Returns an error if the controller cannot be queried or the signal has
/// no program definitions.
pub fn active_logic<C: SignalController + ?Sized>(
    ctl: &C,
    signal: &SignalId,
) -> Result<ProgramLogic, SimError> {
    let active_id = ctl.program(signal)?;
    let mut logics = ctl.program_logics(signal)?;
    if let Some(pos) = logics.iter().position(|l| l.program_id == active_id) {
        return Ok(logics.swap_remove(pos));
    }
    if logics.is_empty() {
        return Err(SimError::UnknownProgram {
            signal: signal.to_string(),
            program: active_id,
        });
    }
    Ok(logics.swap_remove(0))
}
