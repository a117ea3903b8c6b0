//! Structured event stream.
//!
//! Discrete, typed events emitted during a control-loop run. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All configured steps ran.
    Completed,
    /// Interrupted by SIGINT.
    Interrupted,
    /// Terminated by SIGTERM.
    Terminated,
    /// The simulation could not advance.
    SimulationFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Terminated => "terminated",
            Self::SimulationFailed => "simulation failed",
        })
    }
}

/// Totals reported when a run stops.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RunSummary {
    /// Steps that completed.
    pub steps: u64,
    /// Simulation clock at the end of the run, seconds.
    pub sim_time: f64,
    /// Near misses over the whole run.
    pub total_near_misses: u64,
    /// Summed per-step vehicle waiting time, seconds.
    pub total_delay: f64,
    /// Plans committed.
    pub optimizations_committed: u64,
    /// Optimizer calls that left the plan unchanged.
    pub optimizations_unchanged: u64,
    /// Optimizer calls that returned an error.
    pub optimizations_failed: u64,
    /// Epoch at the end of the run.
    pub final_epoch: u32,
    /// Phase switches observed.
    pub phase_switches: u64,
    /// Steps whose phase observation failed.
    pub lost_observations: u64,
    /// Wall-clock run time, seconds.
    pub elapsed_secs: f64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "steps={} sim_time={:.0}s near_misses={} delay={:.1}s optimizations={}/{}/{} epoch={} switches={} lost={} elapsed={:.1}s",
            self.steps,
            self.sim_time,
            self.total_near_misses,
            self.total_delay,
            self.optimizations_committed,
            self.optimizations_unchanged,
            self.optimizations_failed,
            self.final_epoch,
            self.phase_switches,
            self.lost_observations,
            self.elapsed_secs,
        )
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a run.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The control loop is about to take its first step.
    RunStarted {
        /// When the run started.
        timestamp: DateTime<Utc>,
        /// Unique run identifier.
        run_id: String,
        /// Controlled signal.
        signal_id: String,
        /// `opt` or `baseline`.
        mode: String,
        /// Configured number of steps.
        steps: u64,
        /// Steps between optimizer calls.
        optimize_interval: u64,
    },

    /// A new plan was committed.
    OptimizationApplied {
        /// When the plan was committed.
        timestamp: DateTime<Utc>,
        /// Step that triggered the optimization.
        step: u64,
        /// Program id the plan was committed under.
        program_id: String,
        /// Durations the optimizer asked for.
        requested_durations: Vec<u32>,
        /// Durations read back from the controller.
        applied_durations: Vec<f64>,
    },

    /// An optimizer call left the plan as it was.
    OptimizationSkipped {
        /// When the call returned.
        timestamp: DateTime<Utc>,
        /// Step that triggered the optimization.
        step: u64,
        /// Solver status or error message.
        reason: String,
    },

    /// The epoch counter moved forward.
    EpochAdvanced {
        /// When the epoch changed.
        timestamp: DateTime<Utc>,
        /// Step at which the epoch changed.
        step: u64,
        /// New epoch.
        epoch: u32,
    },

    /// The run stopped.
    RunStopped {
        /// When the run stopped.
        timestamp: DateTime<Utc>,
        /// Why the run stopped.
        reason: StopReason,
        /// Run totals.
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<RunSummary>,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are silently dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock()
            && let Ok(line) = serde_json::to_string(&envelope)
        {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
