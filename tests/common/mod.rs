//! Shared integration-test harness: a fault-injecting environment wrapped
//! around the synthetic junction, and helpers for spawning the binary.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Output};

use phasetune::config::SyntheticConfig;
use phasetune::error::SimError;
use phasetune::sim::{
    Position, ProgramLogic, SignalController, SignalId, SimulationEnvironment, SyntheticEnvironment,
    VehicleSource,
};

// ============================================================================
// Fault-injecting environment
// ============================================================================

/// Synthetic environment with scripted failures.
///
/// Step numbers are 0-based and count completed `step()` calls.
#[derive(Debug)]
pub struct FaultyEnvironment {
    inner: SyntheticEnvironment,
    steps_taken: u64,
    /// `step()` fails from this step on.
    pub fail_step_at: Option<u64>,
    /// `phase()` fails while the current step is in this set.
    pub phase_outages: BTreeSet<u64>,
    /// Every `set_program_logic` call fails.
    pub reject_programs: bool,
    /// Every `program_logics` call fails.
    pub hide_programs: bool,
    /// Position queries fail for these vehicles.
    pub broken_vehicles: BTreeSet<String>,
    /// Set once `close()` was called.
    pub closed: bool,
}

impl FaultyEnvironment {
    pub fn new() -> Self {
        Self::with_config(&SyntheticConfig::default())
    }

    pub fn with_config(config: &SyntheticConfig) -> Self {
        Self {
            inner: SyntheticEnvironment::new(config),
            steps_taken: 0,
            fail_step_at: None,
            phase_outages: BTreeSet::new(),
            reject_programs: false,
            hide_programs: false,
            broken_vehicles: BTreeSet::new(),
            closed: false,
        }
    }

    pub fn signal() -> SignalId {
        SignalId::new("J0")
    }

    fn refuse(signal: &SignalId, operation: &'static str) -> SimError {
        SimError::SignalAccess {
            signal: signal.to_string(),
            operation,
            reason: "injected fault".to_string(),
        }
    }
}

impl VehicleSource for FaultyEnvironment {
    fn vehicle_ids(&self) -> Result<Vec<String>, SimError> {
        self.inner.vehicle_ids()
    }

    fn vehicle_position(&self, id: &str) -> Result<Position, SimError> {
        if self.broken_vehicles.contains(id) {
            return Err(SimError::VehicleAccess {
                id: id.to_string(),
                reason: "injected fault".to_string(),
            });
        }
        self.inner.vehicle_position(id)
    }

    fn vehicle_speed(&self, id: &str) -> Result<f64, SimError> {
        self.inner.vehicle_speed(id)
    }

    fn vehicle_waiting_time(&self, id: &str) -> Result<f64, SimError> {
        self.inner.vehicle_waiting_time(id)
    }
}

impl SignalController for FaultyEnvironment {
    fn signal_ids(&self) -> Result<Vec<SignalId>, SimError> {
        self.inner.signal_ids()
    }

    fn program(&self, signal: &SignalId) -> Result<String, SimError> {
        self.inner.program(signal)
    }

    fn set_program(&mut self, signal: &SignalId, program_id: &str) -> Result<(), SimError> {
        self.inner.set_program(signal, program_id)
    }

    fn phase(&self, signal: &SignalId) -> Result<usize, SimError> {
        if self.phase_outages.contains(&self.steps_taken) {
            return Err(Self::refuse(signal, "phase"));
        }
        self.inner.phase(signal)
    }

    fn set_phase(&mut self, signal: &SignalId, index: usize) -> Result<(), SimError> {
        self.inner.set_phase(signal, index)
    }

    fn signal_state(&self, signal: &SignalId) -> Result<String, SimError> {
        self.inner.signal_state(signal)
    }

    fn program_logics(&self, signal: &SignalId) -> Result<Vec<ProgramLogic>, SimError> {
        if self.hide_programs {
            return Err(Self::refuse(signal, "program_logics"));
        }
        self.inner.program_logics(signal)
    }

    fn time_since_last_switch(&self, signal: &SignalId) -> Result<f64, SimError> {
        self.inner.time_since_last_switch(signal)
    }

    fn set_program_logic(&mut self, signal: &SignalId, logic: ProgramLogic) -> Result<(), SimError> {
        if self.reject_programs {
            return Err(Self::refuse(signal, "set_program_logic"));
        }
        self.inner.set_program_logic(signal, logic)
    }

    fn controlled_lanes(&self, signal: &SignalId) -> Result<Vec<String>, SimError> {
        self.inner.controlled_lanes(signal)
    }
}

impl SimulationEnvironment for FaultyEnvironment {
    fn step(&mut self) -> Result<(), SimError> {
        if self.fail_step_at.is_some_and(|n| self.steps_taken >= n) {
            return Err(SimError::StepFailed("injected step failure".to_string()));
        }
        self.inner.step()?;
        self.steps_taken += 1;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.inner.time()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

// ============================================================================
// CSV helpers
// ============================================================================

/// Data rows of a CSV file, split on commas, header dropped.
pub fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    text.lines()
        .skip(1)
        .filter(|l| !l.is_empty())
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect()
}

// ============================================================================
// Binary helpers
// ============================================================================

/// Runs the `phasetune` binary to completion with `args`, in `cwd`.
pub fn run_phasetune(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_phasetune"))
        .args(args)
        .current_dir(cwd)
        .env_remove("PHASETUNE_LOG_LEVEL")
        .env_remove("PHASETUNE_STEPS")
        .env_remove("PHASETUNE_OPTIMIZE_INTERVAL")
        .env_remove("PHASETUNE_TLS")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to spawn phasetune")
}
