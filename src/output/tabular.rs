//! CSV run logs.
//!
//! Every log stream is best-effort: the first write failure disables that
//! stream for the rest of the run and the control loop carries on.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::observability::metrics;
use crate::optimizer::OptimizationResult;
use crate::phase::ObservedPhaseEvent;
use crate::phase::stats::round2;
use crate::sim::SignalId;

/// Header of the change log.
pub const CHANGES_HEADER: [&str; 4] = ["step", "tls_id", "requested_durations", "applied_durations"];

/// Header of the observation log.
pub const OBSERVED_HEADER: [&str; 6] = [
    "switch_step",
    "tls_id",
    "phase_index",
    "state",
    "observed_duration_sec",
    "epoch",
];

/// Header of the risk trend.
pub const RISK_HEADER: [&str; 2] = ["step", "avg_risk"];

/// A CSV stream that turns itself off after the first failure.
pub struct CsvLog<W: Write = File> {
    name: &'static str,
    location: PathBuf,
    writer: Option<csv::Writer<W>>,
    rows: u64,
}

impl<W: Write> std::fmt::Debug for CsvLog<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvLog")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("enabled", &self.writer.is_some())
            .field("rows", &self.rows)
            .finish()
    }
}

impl CsvLog<File> {
    /// Creates `path` and writes the header.
    ///
    /// If the file cannot be created the stream starts disabled.
    pub fn create(name: &'static str, path: &Path, header: &[&str]) -> Self {
        match File::create(path) {
            Ok(file) => Self::from_writer(name, path, file, header),
            Err(e) => {
                warn!(stream = name, path = %path.display(), error = %e, "cannot open log; stream disabled");
                metrics::record_log_stream_failure(name);
                Self::disabled(name, path)
            }
        }
    }
}

impl<W: Write> CsvLog<W> {
    /// Wraps an arbitrary writer and writes the header.
    pub fn from_writer(name: &'static str, location: &Path, writer: W, header: &[&str]) -> Self {
        let mut log = Self {
            name,
            location: location.to_path_buf(),
            writer: Some(
                csv::WriterBuilder::new()
                    .terminator(csv::Terminator::Any(b'\n'))
                    .from_writer(writer),
            ),
            rows: 0,
        };
        log.write(header);
        log.rows = 0;
        log
    }

    /// A stream that discards every row.
    #[must_use]
    pub fn disabled(name: &'static str, location: &Path) -> Self {
        Self {
            name,
            location: location.to_path_buf(),
            writer: None,
            rows: 0,
        }
    }

    /// Returns `true` while the stream accepts rows.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Rows written since the header.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.rows
    }

    /// File the stream writes to.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Appends one record and flushes it.
    pub fn write<I, T>(&mut self, record: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let result = writer
            .write_record(record)
            .and_then(|()| writer.flush().map_err(csv::Error::from));
        match result {
            Ok(()) => self.rows += 1,
            Err(e) => self.fail(&e),
        }
    }

    /// Flushes buffered rows.
    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writer.flush()
        {
            self.fail(&e);
        }
    }

    fn fail(&mut self, error: &dyn std::fmt::Display) {
        warn!(
            stream = self.name,
            path = %self.location.display(),
            error = %error,
            "write failed; stream disabled for the rest of the run"
        );
        metrics::record_log_stream_failure(self.name);
        self.writer = None;
    }
}

/// Joins values with `;`.
pub fn join_durations<T: std::fmt::Debug>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// The three CSV streams of a run.
#[derive(Debug)]
pub struct RunLogs<W: Write = File> {
    /// Committed plans
    pub changes: CsvLog<W>,
    /// Observed phase switches
    pub observed: CsvLog<W>,
    /// Per-step average risk
    pub risk: CsvLog<W>,
}

impl RunLogs<File> {
    /// Opens all streams under the configured paths.
    #[must_use]
    pub fn create(changes: &Path, observed: &Path, risk: &Path) -> Self {
        Self {
            changes: CsvLog::create("changes", changes, &CHANGES_HEADER),
            observed: CsvLog::create("observed", observed, &OBSERVED_HEADER),
            risk: CsvLog::create("risk", risk, &RISK_HEADER),
        }
    }
}

impl<W: Write> RunLogs<W> {
    /// Logs a committed plan.
    pub fn record_change(&mut self, step: u64, signal: &SignalId, result: &OptimizationResult) {
        self.changes.write([
            step.to_string(),
            signal.to_string(),
            join_durations(&result.requested_durations),
            join_durations(&result.applied_durations),
        ]);
    }

    /// Logs an observed phase switch.
    pub fn record_observation(&mut self, event: &ObservedPhaseEvent) {
        self.observed.write([
            event.switch_step.to_string(),
            event.signal_id.to_string(),
            event.phase_index.to_string(),
            event.state.clone(),
            format!("{:?}", round2(event.observed_duration)),
            event.epoch.to_string(),
        ]);
    }

    /// Logs one step's average risk.
    pub fn record_risk(&mut self, step: u64, avg_risk: f64) {
        self.risk.write([step.to_string(), format!("{avg_risk:?}")]);
    }

    /// Flushes every stream.
    pub fn flush(&mut self) {
        self.changes.flush();
        self.observed.flush();
        self.risk.flush();
        debug!(
            changes = self.changes.rows(),
            observed = self.observed.rows(),
            risk = self.risk.rows(),
            "run logs flushed"
        );
    }
}
