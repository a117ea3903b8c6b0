//! The step loop.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::SimError;
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter, RunSummary, StopReason};
use crate::optimizer::{OptimizationInput, OptimizerState, Outcome, PhaseOptimizer};
use crate::output::RunLogs;
use crate::phase::{PhaseSummary, PhaseTracker};
use crate::risk::{IntervalAccumulator, NearMissDetector};
use crate::sim::{SignalId, SimulationEnvironment, VehicleSource};

use super::{LoopSettings, Shutdown};

/// Everything a finished run reports.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Why the loop stopped
    pub stop_reason: StopReason,
    /// Run totals
    pub summary: RunSummary,
    /// Observed phase durations
    pub phases: PhaseSummary,
    /// The step failure that ended the run, if any
    pub fatal: Option<SimError>,
    /// Every observed switch reached the observation log
    pub observations_logged: bool,
}

/// Drives one signal through a run.
#[derive(Debug)]
pub struct ControlLoop {
    signal: SignalId,
    settings: LoopSettings,
    detector: NearMissDetector,
    optimizer: PhaseOptimizer,
    events: Arc<EventEmitter>,
    shutdown: Shutdown,
}

impl ControlLoop {
    /// Creates a loop with no event stream and its own shutdown handle.
    #[must_use]
    pub fn new(
        signal: SignalId,
        settings: LoopSettings,
        detector: NearMissDetector,
        optimizer: PhaseOptimizer,
    ) -> Self {
        Self {
            signal,
            settings,
            detector,
            optimizer,
            events: Arc::new(EventEmitter::noop()),
            shutdown: Shutdown::new(),
        }
    }

    /// Sends lifecycle events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// Stops at the next step boundary once `shutdown` is requested.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Controlled signal.
    #[must_use]
    pub const fn signal(&self) -> &SignalId {
        &self.signal
    }

    /// Runs until the configured step count, a shutdown request, or a
    /// failed step, then closes `env` and flushes `logs`.
    pub fn run<E, W>(&self, env: &mut E, logs: &mut RunLogs<W>) -> RunReport
    where
        E: SimulationEnvironment + ?Sized,
        W: Write,
    {
        let started = Instant::now();
        self.events.emit(Event::RunStarted {
            timestamp: Utc::now(),
            run_id: uuid::Uuid::new_v4().to_string(),
            signal_id: self.signal.to_string(),
            mode: self.settings.mode.to_string(),
            steps: self.settings.steps,
            optimize_interval: self.settings.optimize_interval,
        });
        info!(
            signal = %self.signal,
            mode = %self.settings.mode,
            steps = self.settings.steps,
            interval = self.settings.optimize_interval,
            "control loop started"
        );

        let mut tracker = PhaseTracker::new(self.signal.clone());
        let mut state = OptimizerState::new();
        let mut interval = IntervalAccumulator::default();
        let mut summary = RunSummary::default();
        let mut stop_reason = StopReason::Completed;
        let mut fatal = None;

        for step in 0..self.settings.steps {
            if let Some(reason) = self.shutdown.reason() {
                info!(step, %reason, "stopping at step boundary");
                stop_reason = reason;
                break;
            }

            if let Err(e) = env.step() {
                error!(step, error = %e, "simulation step failed; ending run");
                stop_reason = StopReason::SimulationFailed;
                fatal = Some(e);
                break;
            }
            let now = env.time();
            metrics::record_step(now);

            let scan = self.detector.scan(&*env);
            let delay = step_delay(&*env);
            interval.add(&scan.sample, delay);
            summary.total_near_misses += scan.sample.near_miss_count;
            summary.total_delay += delay;
            metrics::record_near_misses(scan.sample.near_miss_count);
            logs.record_risk(step, scan.sample.avg_risk);

            match tracker.observe(&*env, step, now, state.epoch()) {
                Ok(Some(event)) => {
                    summary.phase_switches += 1;
                    metrics::record_phase_switch(event.phase_index);
                    logs.record_observation(&event);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(step, error = %e, "phase observation lost");
                    summary.lost_observations += 1;
                    metrics::record_lost_observation();
                }
            }

            if self.settings.optimizes_at(step) {
                self.optimize(env, step, &interval, &mut state, &mut summary, logs);
                interval.reset();
            }

            summary.steps = step + 1;
        }

        env.close();
        logs.flush();

        summary.sim_time = env.time();
        summary.final_epoch = state.epoch();
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        info!(reason = %stop_reason, %summary, "control loop stopped");
        self.events.emit(Event::RunStopped {
            timestamp: Utc::now(),
            reason: stop_reason,
            summary: Some(summary.clone()),
        });

        RunReport {
            stop_reason,
            summary,
            phases: tracker.summary(),
            fatal,
            observations_logged: logs.observed.is_enabled(),
        }
    }

    fn optimize<E, W>(
        &self,
        env: &mut E,
        step: u64,
        interval: &IntervalAccumulator,
        state: &mut OptimizerState,
        summary: &mut RunSummary,
        logs: &mut RunLogs<W>,
    ) where
        E: SimulationEnvironment + ?Sized,
        W: Write,
    {
        let input = OptimizationInput {
            near_miss_count: interval.near_miss_sum,
            avg_risk: interval.average_risk(),
        };
        metrics::set_interval_risk(input.avg_risk);
        debug!(
            step,
            near_misses = input.near_miss_count,
            avg_risk = input.avg_risk,
            avg_delay = interval.average_delay(),
            "optimizing"
        );

        match self.optimizer.optimize(state, env, &self.signal, input) {
            Ok(Outcome::Committed(result)) => {
                summary.optimizations_committed += 1;
                metrics::record_optimization("committed");
                metrics::set_epoch(result.epoch);
                logs.record_change(step, &self.signal, &result);
                self.events.emit(Event::OptimizationApplied {
                    timestamp: Utc::now(),
                    step,
                    program_id: result.program_id.clone(),
                    requested_durations: result.requested_durations.clone(),
                    applied_durations: result.applied_durations.clone(),
                });
                self.events.emit(Event::EpochAdvanced {
                    timestamp: Utc::now(),
                    step,
                    epoch: result.epoch,
                });
            }
            Ok(Outcome::Unchanged { status, .. }) => {
                summary.optimizations_unchanged += 1;
                metrics::record_optimization("unchanged");
                self.events.emit(Event::OptimizationSkipped {
                    timestamp: Utc::now(),
                    step,
                    reason: status.to_string(),
                });
            }
            Err(e) => {
                warn!(step, signal = %self.signal, error = %e, "optimization failed; plan unchanged");
                summary.optimizations_failed += 1;
                metrics::record_optimization("failed");
                self.events.emit(Event::OptimizationSkipped {
                    timestamp: Utc::now(),
                    step,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Summed waiting time of every readable vehicle.
fn step_delay<V: VehicleSource + ?Sized>(source: &V) -> f64 {
    let Ok(ids) = source.vehicle_ids() else {
        return 0.0;
    };
    ids.iter()
        .filter_map(|id| source.vehicle_waiting_time(id).ok())
        .sum()
}
