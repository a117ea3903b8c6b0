//! Phase-switch state machine.

use serde::Serialize;
use tracing::debug;

use crate::error::SimError;
use crate::sim::{SignalController, SignalId, active_logic};

use super::stats::{self, EpochSummary, PhaseStats, PhaseSummary};

/// State string recorded when the outgoing phase cannot be resolved.
pub const UNKNOWN_STATE: &str = "?";

/// A completed phase, emitted when the active phase index changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedPhaseEvent {
    /// Step at which the switch was seen
    pub switch_step: u64,
    /// Signal the phase belongs to
    pub signal_id: SignalId,
    /// Index of the phase that just ended
    pub phase_index: usize,
    /// Signal-color string of the phase that just ended
    pub state: String,
    /// How long the phase actually ran, seconds
    pub observed_duration: f64,
    /// Epoch the switch was observed in
    pub epoch: u32,
}

#[derive(Debug, Clone, Copy)]
struct ActivePhase {
    index: usize,
    started_at: f64,
}

/// Tracks actual phase durations of one signal across epochs.
#[derive(Debug)]
pub struct PhaseTracker {
    signal: SignalId,
    active: Option<ActivePhase>,
    global: PhaseStats,
    by_epoch: std::collections::BTreeMap<u32, PhaseStats>,
}

impl PhaseTracker {
    /// Creates a tracker for `signal`.
    #[must_use]
    pub fn new(signal: SignalId) -> Self {
        Self {
            signal,
            active: None,
            global: PhaseStats::new(),
            by_epoch: std::collections::BTreeMap::new(),
        }
    }

    /// The tracked signal.
    #[must_use]
    pub const fn signal(&self) -> &SignalId {
        &self.signal
    }

    /// Samples the active phase at simulation time `now`.
    ///
    /// The first call only establishes the starting point. When a signal is
    /// already mid-phase, its start is reconstructed from the controller's
    /// time since the last switch. Later calls return an event whenever the
    /// active phase index differs from the previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the active phase index cannot be read. The
    /// tracker state is left untouched in that case.
    pub fn observe<C: SignalController + ?Sized>(
        &mut self,
        ctl: &C,
        step: u64,
        now: f64,
        epoch: u32,
    ) -> Result<Option<ObservedPhaseEvent>, SimError> {
        let index = ctl.phase(&self.signal)?;

        let Some(prev) = self.active else {
            let started_at = ctl
                .time_since_last_switch(&self.signal)
                .map_or(now, |elapsed| (now - elapsed).max(0.0));
            debug!(signal = %self.signal, phase = index, started_at, "tracking started");
            self.active = Some(ActivePhase { index, started_at });
            return Ok(None);
        };

        if index == prev.index {
            return Ok(None);
        }

        let observed_duration = (now - prev.started_at).max(0.0);
        let state = self.resolve_state(ctl, prev.index);
        self.global
            .entry(prev.index)
            .or_default()
            .record(observed_duration);
        self.by_epoch
            .entry(epoch)
            .or_default()
            .entry(prev.index)
            .or_default()
            .record(observed_duration);
        self.active = Some(ActivePhase {
            index,
            started_at: now,
        });

        Ok(Some(ObservedPhaseEvent {
            switch_step: step,
            signal_id: self.signal.clone(),
            phase_index: prev.index,
            state,
            observed_duration,
            epoch,
        }))
    }

    fn resolve_state<C: SignalController + ?Sized>(&self, ctl: &C, index: usize) -> String {
        match active_logic(ctl, &self.signal) {
            Ok(logic) => logic
                .phases
                .get(index)
                .map_or_else(|| UNKNOWN_STATE.to_string(), |p| p.state.clone()),
            Err(e) => {
                debug!(signal = %self.signal, error = %e, "outgoing phase state unresolved");
                UNKNOWN_STATE.to_string()
            }
        }
    }

    /// Statistics over every epoch.
    #[must_use]
    pub const fn global_stats(&self) -> &PhaseStats {
        &self.global
    }

    /// Statistics for one epoch, if any switch was observed in it.
    #[must_use]
    pub fn epoch_stats(&self, epoch: u32) -> Option<&PhaseStats> {
        self.by_epoch.get(&epoch)
    }

    /// Epochs in which at least one switch was observed.
    pub fn epochs(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_epoch.keys().copied()
    }

    /// Rounded averages for reporting.
    #[must_use]
    pub fn summary(&self) -> PhaseSummary {
        PhaseSummary {
            global: stats::averages(&self.global),
            epochs: self
                .by_epoch
                .iter()
                .map(|(&epoch, phases)| EpochSummary {
                    epoch,
                    label: stats::epoch_label(epoch),
                    phases: stats::averages(phases),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyntheticConfig;
    use crate::sim::{ProgramLogic, SimulationEnvironment, SyntheticEnvironment};

    fn j0() -> SignalId {
        SignalId::new("J0")
    }

    #[test]
    fn first_observation_emits_nothing() {
        let env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let mut tracker = PhaseTracker::new(j0());
        assert!(tracker.observe(&env, 0, 0.0, 0).unwrap().is_none());
        assert!(tracker.summary().is_empty());
    }

    #[test]
    fn records_full_phases_from_synthetic_cycle() {
        let mut env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let mut tracker = PhaseTracker::new(j0());
        let mut events = Vec::new();
        for step in 0..200 {
            env.step().unwrap();
            if let Some(event) = tracker.observe(&env, step, env.time(), 0).unwrap() {
                events.push(event);
            }
        }
        assert!(events.len() >= 4);
        assert_eq!(events[0].phase_index, 0);
        assert_eq!(events[0].state, "GGrr");
        assert!((events[0].observed_duration - 42.0).abs() < 1e-9);
        assert_eq!(events[1].state, "yyrr");
        assert!((events[1].observed_duration - 3.0).abs() < 1e-9);
    }

    #[test]
    fn mid_phase_start_uses_elapsed_since_switch() {
        let mut env = SyntheticEnvironment::new(&SyntheticConfig::default());
        for _ in 0..10 {
            env.step().unwrap();
        }
        let mut tracker = PhaseTracker::new(j0());
        tracker.observe(&env, 9, env.time(), 0).unwrap();
        let mut first = None;
        for step in 10..60 {
            env.step().unwrap();
            if let Some(e) = tracker.observe(&env, step, env.time(), 0).unwrap() {
                first = Some(e);
                break;
            }
        }
        let first = first.unwrap();
        assert!((first.observed_duration - 42.0).abs() < 1e-9);
    }

    #[test]
    fn epochs_are_segmented() {
        let mut env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let mut tracker = PhaseTracker::new(j0());
        for step in 0..300 {
            env.step().unwrap();
            let epoch = u32::from(step >= 150);
            tracker.observe(&env, step, env.time(), epoch).unwrap();
        }
        assert_eq!(tracker.epochs().collect::<Vec<_>>(), vec![0, 1]);
        let summary = tracker.summary();
        assert_eq!(summary.epochs[1].label, "after optimization #1");
    }

    #[test]
    fn state_comes_from_active_program() {
        let mut env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let signal = j0();
        let mut tracker = PhaseTracker::new(signal.clone());
        tracker.observe(&env, 0, 0.0, 0).unwrap();

        let mut logic: ProgramLogic = active_logic(&env, &signal).unwrap();
        logic.program_id = "alt".into();
        for phase in &mut logic.phases {
            phase.state = phase.state.to_lowercase();
        }
        env.set_program_logic(&signal, logic).unwrap();
        env.set_program(&signal, "alt").unwrap();
        env.set_phase(&signal, 1).unwrap();

        let event = tracker.observe(&env, 1, 1.0, 0).unwrap().unwrap();
        assert_eq!(event.phase_index, 0);
        assert_eq!(event.state, "ggrr");
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        let mut env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let mut tracker = PhaseTracker::new(j0());
        tracker.observe(&env, 0, 10.0, 0).unwrap();
        env.set_phase(&j0(), 2).unwrap();
        let event = tracker.observe(&env, 1, 5.0, 0).unwrap().unwrap();
        assert!(event.observed_duration.abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_signal_is_reported_to_caller() {
        let env = SyntheticEnvironment::new(&SyntheticConfig::default());
        let mut tracker = PhaseTracker::new(SignalId::new("missing"));
        assert!(tracker.observe(&env, 0, 0.0, 0).is_err());
    }
}
