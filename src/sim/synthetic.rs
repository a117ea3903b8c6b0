//! Deterministic synthetic environment.
//!
//! A single four-approach junction driven by a fixed-time signal program.
//! Vehicles arrive at random on each approach, follow their leader, stop at
//! the stop line while their approach is not green, and leave the network
//! once they are far enough past the junction. Equal seeds give identical
//! runs.
//!
//! This is a stand-in for an external simulator so the control loop can be
//! exercised end to end; it makes no claim to traffic realism.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::config::SyntheticConfig;
use crate::error::SimError;

use super::{
    LogicKind, Position, ProgramLogic, SignalController, SignalId, SignalPhase,
    SimulationEnvironment, VehicleSource,
};

/// Distance from spawn point to the junction centre, metres.
const APPROACH_LENGTH: f64 = 200.0;
/// Distance from the stop line to the junction centre, metres.
const STOP_LINE_OFFSET: f64 = 10.0;
/// Lateral lane offset from the road axis, metres.
const LANE_OFFSET: f64 = 1.6;
/// Bumper-to-bumper standstill gap, metres.
const MIN_GAP: f64 = 7.5;
/// Acceleration, m/s².
const ACCEL: f64 = 2.6;
/// Speed below which a vehicle counts as waiting, m/s.
const WAITING_SPEED: f64 = 0.1;

/// Travel direction of an approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Approach {
    West,
    East,
    South,
    North,
}

impl Approach {
    const ALL: [Self; 4] = [Self::West, Self::East, Self::South, Self::North];

    /// Index of the approach's character in the signal state string.
    const fn link_index(self) -> usize {
        match self {
            Self::West => 0,
            Self::East => 1,
            Self::South => 2,
            Self::North => 3,
        }
    }

    const fn lane_id(self) -> &'static str {
        match self {
            Self::West => "W_in_0",
            Self::East => "E_in_0",
            Self::South => "S_in_0",
            Self::North => "N_in_0",
        }
    }

    /// Position at path coordinate `s` (0 at spawn, increasing toward and
    /// past the junction).
    fn position(self, s: f64) -> Position {
        let along = s - APPROACH_LENGTH;
        match self {
            Self::West => Position::new(along, -LANE_OFFSET),
            Self::East => Position::new(-along, LANE_OFFSET),
            Self::South => Position::new(LANE_OFFSET, along),
            Self::North => Position::new(-LANE_OFFSET, -along),
        }
    }
}

#[derive(Debug, Clone)]
struct Vehicle {
    approach: Approach,
    s: f64,
    speed: f64,
    desired_speed: f64,
    waiting: f64,
}

#[derive(Debug)]
struct SignalRuntime {
    programs: BTreeMap<String, ProgramLogic>,
    active: String,
    phase: usize,
    in_phase: f64,
}

impl SignalRuntime {
    fn active_logic(&self) -> Option<&ProgramLogic> {
        self.programs.get(&self.active)
    }

    fn state(&self) -> String {
        self.active_logic()
            .and_then(|l| l.phases.get(self.phase))
            .map(|p| p.state.clone())
            .unwrap_or_default()
    }

    fn advance(&mut self, dt: f64) {
        let Some(logic) = self.programs.get(&self.active) else {
            return;
        };
        let count = logic.phases.len();
        if count == 0 {
            return;
        }
        self.in_phase += dt;
        let duration = logic.phases[self.phase.min(count - 1)].duration;
        if self.in_phase >= duration {
            self.phase = (self.phase + 1) % count;
            self.in_phase = 0.0;
        }
    }
}

/// Bundled deterministic single-junction environment.
#[derive(Debug)]
pub struct SyntheticEnvironment {
    rng: StdRng,
    time: f64,
    step_length: f64,
    arrival_rate: f64,
    max_speed: f64,
    next_vehicle: u64,
    vehicles: BTreeMap<String, Vehicle>,
    signal_id: SignalId,
    signal: SignalRuntime,
}

impl SyntheticEnvironment {
    /// Creates the environment with a one-second step.
    #[must_use]
    pub fn new(config: &SyntheticConfig) -> Self {
        Self::with_step_length(config, 1.0)
    }

    /// Creates the environment with the given step length in seconds.
    #[must_use]
    pub fn with_step_length(config: &SyntheticConfig, step_length: f64) -> Self {
        const STATES: [&str; 4] = ["GGrr", "yyrr", "rrGG", "rryy"];
        let phases = STATES
            .iter()
            .enumerate()
            .map(|(i, state)| {
                let duration = config
                    .phase_durations
                    .get(i)
                    .copied()
                    .unwrap_or(if i % 2 == 0 { 42.0 } else { 3.0 });
                SignalPhase {
                    name: format!("phase{i}"),
                    ..SignalPhase::fixed(duration, *state)
                }
            })
            .collect();
        let logic = ProgramLogic {
            program_id: "0".to_string(),
            kind: LogicKind::Static,
            current_phase_index: 0,
            phases,
        };
        let mut programs = BTreeMap::new();
        programs.insert(logic.program_id.clone(), logic);

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            time: 0.0,
            step_length,
            arrival_rate: config.arrival_rate.clamp(0.0, 1.0),
            max_speed: config.max_speed,
            next_vehicle: 0,
            vehicles: BTreeMap::new(),
            signal_id: SignalId::new(config.signal_id.clone()),
            signal: SignalRuntime {
                programs,
                active: "0".to_string(),
                phase: 0,
                in_phase: 0.0,
            },
        }
    }

    fn check_signal(&self, signal: &SignalId) -> Result<(), SimError> {
        if *signal == self.signal_id {
            Ok(())
        } else {
            Err(SimError::UnknownSignal(signal.to_string()))
        }
    }

    fn vehicle(&self, id: &str) -> Result<&Vehicle, SimError> {
        self.vehicles.get(id).ok_or_else(|| SimError::VehicleAccess {
            id: id.to_string(),
            reason: "not in network".to_string(),
        })
    }

    fn spawn_arrivals(&mut self) {
        for approach in Approach::ALL {
            if !self.rng.random_bool(self.arrival_rate) {
                continue;
            }
            let entry_blocked = self
                .vehicles
                .values()
                .any(|v| v.approach == approach && v.s < MIN_GAP);
            if entry_blocked {
                continue;
            }
            let desired_speed = self.max_speed * self.rng.random_range(0.8..=1.05);
            let id = format!("veh{}", self.next_vehicle);
            self.next_vehicle += 1;
            trace!(vehicle = %id, ?approach, "vehicle departed");
            self.vehicles.insert(
                id,
                Vehicle {
                    approach,
                    s: 0.0,
                    speed: desired_speed * 0.5,
                    desired_speed,
                    waiting: 0.0,
                },
            );
        }
    }

    fn move_vehicles(&mut self) {
        let dt = self.step_length;
        let state: Vec<char> = self.signal.state().chars().collect();
        let stop_line = APPROACH_LENGTH - STOP_LINE_OFFSET;

        for approach in Approach::ALL {
            let may_pass = state.get(approach.link_index()).is_some_and(|c| *c == 'G');

            // Front-most vehicle first so each follower sees its leader's new position.
            let mut lane: Vec<(String, f64)> = self
                .vehicles
                .iter()
                .filter(|(_, v)| v.approach == approach)
                .map(|(id, v)| (id.clone(), v.s))
                .collect();
            lane.sort_by(|a, b| b.1.total_cmp(&a.1));

            let mut leader_s: Option<f64> = None;
            for (id, _) in lane {
                let Some(v) = self.vehicles.get_mut(&id) else {
                    continue;
                };
                let mut room = f64::INFINITY;
                if let Some(ls) = leader_s {
                    room = room.min(ls - MIN_GAP - v.s);
                }
                if !may_pass && v.s <= stop_line {
                    room = room.min(stop_line - v.s);
                }
                let target = (v.speed + ACCEL * dt).min(v.desired_speed);
                v.speed = target.min(room.max(0.0) / dt).max(0.0);
                v.s += v.speed * dt;
                if v.speed < WAITING_SPEED {
                    v.waiting += dt;
                } else {
                    v.waiting = 0.0;
                }
                leader_s = Some(v.s);
            }
        }

        self.vehicles.retain(|_, v| v.s < 2.0 * APPROACH_LENGTH);
    }
}

impl VehicleSource for SyntheticEnvironment {
    fn vehicle_ids(&self) -> Result<Vec<String>, SimError> {
        Ok(self.vehicles.keys().cloned().collect())
    }

    fn vehicle_position(&self, id: &str) -> Result<Position, SimError> {
        let v = self.vehicle(id)?;
        Ok(v.approach.position(v.s))
    }

    fn vehicle_speed(&self, id: &str) -> Result<f64, SimError> {
        Ok(self.vehicle(id)?.speed)
    }

    fn vehicle_waiting_time(&self, id: &str) -> Result<f64, SimError> {
        Ok(self.vehicle(id)?.waiting)
    }
}

impl SignalController for SyntheticEnvironment {
    fn signal_ids(&self) -> Result<Vec<SignalId>, SimError> {
        Ok(vec![self.signal_id.clone()])
    }

    fn program(&self, signal: &SignalId) -> Result<String, SimError> {
        self.check_signal(signal)?;
        Ok(self.signal.active.clone())
    }

    fn set_program(&mut self, signal: &SignalId, program_id: &str) -> Result<(), SimError> {
        self.check_signal(signal)?;
        let Some(logic) = self.signal.programs.get(program_id) else {
            return Err(SimError::UnknownProgram {
                signal: signal.to_string(),
                program: program_id.to_string(),
            });
        };
        let last = logic.phases.len().saturating_sub(1);
        self.signal.phase = logic.current_phase_index.min(last);
        self.signal.active = program_id.to_string();
        self.signal.in_phase = 0.0;
        Ok(())
    }

    fn phase(&self, signal: &SignalId) -> Result<usize, SimError> {
        self.check_signal(signal)?;
        Ok(self.signal.phase)
    }

    fn set_phase(&mut self, signal: &SignalId, index: usize) -> Result<(), SimError> {
        self.check_signal(signal)?;
        let count = self.signal.active_logic().map_or(0, |l| l.phases.len());
        if index >= count {
            return Err(SimError::SignalAccess {
                signal: signal.to_string(),
                operation: "set_phase",
                reason: format!("phase index {index} out of range for {count} phases"),
            });
        }
        self.signal.phase = index;
        self.signal.in_phase = 0.0;
        Ok(())
    }

    fn signal_state(&self, signal: &SignalId) -> Result<String, SimError> {
        self.check_signal(signal)?;
        Ok(self.signal.state())
    }

    fn program_logics(&self, signal: &SignalId) -> Result<Vec<ProgramLogic>, SimError> {
        self.check_signal(signal)?;
        Ok(self.signal.programs.values().cloned().collect())
    }

    fn time_since_last_switch(&self, signal: &SignalId) -> Result<f64, SimError> {
        self.check_signal(signal)?;
        Ok(self.signal.in_phase)
    }

    fn set_program_logic(
        &mut self,
        signal: &SignalId,
        logic: ProgramLogic,
    ) -> Result<(), SimError> {
        self.check_signal(signal)?;
        if logic.phases.is_empty() {
            return Err(SimError::SignalAccess {
                signal: signal.to_string(),
                operation: "set_program_logic",
                reason: "program has no phases".to_string(),
            });
        }
        self.signal.programs.insert(logic.program_id.clone(), logic);
        Ok(())
    }

    fn controlled_lanes(&self, signal: &SignalId) -> Result<Vec<String>, SimError> {
        self.check_signal(signal)?;
        Ok(Approach::ALL
            .iter()
            .map(|a| a.lane_id().to_string())
            .collect())
    }
}

impl SimulationEnvironment for SyntheticEnvironment {
    fn step(&mut self) -> Result<(), SimError> {
        self.spawn_arrivals();
        self.move_vehicles();
        self.signal.advance(self.step_length);
        self.time += self.step_length;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> SyntheticEnvironment {
        SyntheticEnvironment::new(&SyntheticConfig::default())
    }

    #[test]
    fn starts_at_time_zero_in_phase_zero() {
        let env = env();
        let j0 = SignalId::new("J0");
        assert!(env.time().abs() < f64::EPSILON);
        assert_eq!(env.phase(&j0).unwrap(), 0);
        assert_eq!(env.signal_state(&j0).unwrap(), "GGrr");
        assert_eq!(env.program(&j0).unwrap(), "0");
    }

    #[test]
    fn fixed_time_program_cycles_phases() {
        let mut env = env();
        let j0 = SignalId::new("J0");
        for _ in 0..42 {
            env.step().unwrap();
        }
        assert_eq!(env.phase(&j0).unwrap(), 1);
        for _ in 0..3 {
            env.step().unwrap();
        }
        assert_eq!(env.phase(&j0).unwrap(), 2);
        assert!(env.time_since_last_switch(&j0).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn same_seed_gives_same_traffic() {
        let mut a = env();
        let mut b = env();
        for _ in 0..200 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.vehicle_ids().unwrap(), b.vehicle_ids().unwrap());
        for id in a.vehicle_ids().unwrap() {
            assert_eq!(
                a.vehicle_position(&id).unwrap(),
                b.vehicle_position(&id).unwrap()
            );
        }
    }

    #[test]
    fn red_approach_queues_and_accumulates_waiting_time() {
        let config = SyntheticConfig {
            arrival_rate: 1.0,
            phase_durations: vec![1000.0, 3.0, 42.0, 3.0],
            ..SyntheticConfig::default()
        };
        let mut env = SyntheticEnvironment::new(&config);
        for _ in 0..120 {
            env.step().unwrap();
        }
        let waiting: f64 = env
            .vehicle_ids()
            .unwrap()
            .iter()
            .map(|id| env.vehicle_waiting_time(id).unwrap())
            .sum();
        assert!(waiting > 0.0, "north/south traffic should be queued");
    }

    #[test]
    fn unknown_vehicle_is_an_access_fault() {
        let env = env();
        let err = env.vehicle_speed("ghost").unwrap_err();
        assert!(matches!(err, SimError::VehicleAccess { .. }));
    }

    #[test]
    fn unknown_signal_rejected() {
        let env = env();
        assert!(matches!(
            env.phase(&SignalId::new("nope")),
            Err(SimError::UnknownSignal(_))
        ));
    }

    #[test]
    fn program_replacement_and_activation() {
        let mut env = env();
        let j0 = SignalId::new("J0");
        let mut logic = super::super::active_logic(&env, &j0).unwrap();
        logic.program_id = "opt_1".into();
        for phase in &mut logic.phases {
            phase.duration = 30.0;
        }
        env.set_program_logic(&j0, logic).unwrap();
        assert_eq!(env.program(&j0).unwrap(), "0");
        env.set_program(&j0, "opt_1").unwrap();
        env.set_phase(&j0, 0).unwrap();
        assert_eq!(env.program(&j0).unwrap(), "opt_1");
        for _ in 0..30 {
            env.step().unwrap();
        }
        assert_eq!(env.phase(&j0).unwrap(), 1);
    }

    #[test]
    fn set_phase_out_of_range_rejected() {
        let mut env = env();
        let j0 = SignalId::new("J0");
        assert!(env.set_phase(&j0, 9).is_err());
    }

    #[test]
    fn set_unknown_program_rejected() {
        let mut env = env();
        let j0 = SignalId::new("J0");
        assert!(matches!(
            env.set_program(&j0, "missing"),
            Err(SimError::UnknownProgram { .. })
        ));
    }
}
