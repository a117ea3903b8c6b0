//! State timeline derived from the observation log.
//!
//! The timeline is a JSONL file with one `{time, signal_id, state}` object
//! per observed phase, `time` being when that phase started relative to the
//! first observed switch.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OutputError;
use crate::phase::stats::round2;
use crate::sim::SignalId;

/// Start of one phase on the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Start time, seconds
    pub time: f64,
    /// Signal the phase belongs to
    pub signal_id: String,
    /// Signal-color string
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct ObservedRecord {
    tls_id: String,
    state: String,
    observed_duration_sec: f64,
}

/// Builds the timeline of `signal` from an observation log.
///
/// Rows for other signals are ignored. Rows that do not parse are skipped.
///
/// # Errors
///
/// Returns [`OutputError::Csv`] if the log cannot be opened.
pub fn build_timeline(observed_csv: &Path, signal: &SignalId) -> Result<Vec<TimelineEvent>, OutputError> {
    let mut reader = csv::Reader::from_path(observed_csv).map_err(|source| OutputError::Csv {
        path: observed_csv.to_path_buf(),
        source,
    })?;

    let mut events = Vec::new();
    let mut elapsed = 0.0;
    for (row, record) in reader.deserialize::<ObservedRecord>().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                debug!(row, error = %e, "skipping malformed observation row");
                continue;
            }
        };
        if record.tls_id != signal.as_str() {
            continue;
        }
        events.push(TimelineEvent {
            time: round2(elapsed),
            signal_id: record.tls_id,
            state: record.state,
        });
        elapsed += record.observed_duration_sec;
    }
    Ok(events)
}

/// Writes timeline events as JSONL.
///
/// # Errors
///
/// Returns [`OutputError::Io`] if the file cannot be written.
pub fn write_timeline(path: &Path, events: &[TimelineEvent]) -> Result<(), OutputError> {
    let io_err = |source: std::io::Error| OutputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    for event in events {
        serde_json::to_writer(&mut out, event).map_err(|e| io_err(e.into()))?;
        out.write_all(b"\n").map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}

/// Reads `(time, state)` pairs of `signal` from JSONL.
///
/// Lines that are not a timeline event are skipped. Reading stops at the
/// first I/O error.
pub fn parse_timeline<R: BufRead>(reader: R, signal: &str) -> Vec<(f64, String)> {
    reader
        .split(b'\n')
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_slice::<TimelineEvent>(&line).ok())
        .filter(|e| e.signal_id == signal && e.time.is_finite())
        .map(|e| (e.time, e.state))
        .collect()
}

/// Average time spent in each state between consecutive events.
///
/// Returns `None` with fewer than two events.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_by_state(events: &[(f64, String)]) -> Option<BTreeMap<String, f64>> {
    if events.len() < 2 {
        return None;
    }
    let mut totals: BTreeMap<&str, (f64, u64)> = BTreeMap::new();
    for pair in events.windows(2) {
        let (t0, state) = (&pair[0].0, pair[0].1.as_str());
        let duration = (pair[1].0 - t0).max(0.0);
        let entry = totals.entry(state).or_default();
        entry.0 += duration;
        entry.1 += 1;
    }
    Some(
        totals
            .into_iter()
            .map(|(state, (sum, count))| (state.to_string(), round2(sum / count as f64)))
            .collect(),
    )
}

/// Average duration per state of `signal` in the timeline at `path`.
///
/// Returns `None` if the file cannot be read or holds fewer than two events
/// for the signal.
#[must_use]
pub fn analyze_timeline(path: &Path, signal: &SignalId) -> Option<BTreeMap<String, f64>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "timeline unreadable");
            return None;
        }
    };
    average_by_state(&parse_timeline(BufReader::new(file), signal.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVED: &str = "\
switch_step,tls_id,phase_index,state,observed_duration_sec,epoch
42,J0,0,GGrr,42.0,0
45,J0,1,yyrr,3.0,0
50,J9,0,GGGG,7.0,0
87,J0,2,rrGG,42.0,0
not,a,valid,row,here,x
90,J0,3,rryy,3.0,1
";

    #[test]
    fn build_accumulates_start_times_per_signal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("observed.csv");
        std::fs::write(&path, OBSERVED).unwrap();

        let events = build_timeline(&path, &SignalId::new("J0")).unwrap();
        let times: Vec<f64> = events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 42.0, 45.0, 87.0]);
        assert_eq!(events[3].state, "rryy");
    }

    #[test]
    fn build_missing_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_timeline(&dir.path().join("nope.csv"), &SignalId::new("J0")).unwrap_err();
        assert!(matches!(err, OutputError::Csv { .. }));
    }

    #[test]
    fn write_then_analyze() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.jsonl");
        let events: Vec<TimelineEvent> = [(0.0, "A"), (40.0, "B"), (43.0, "A"), (83.0, "B")]
            .into_iter()
            .map(|(time, state)| TimelineEvent {
                time,
                signal_id: "J0".into(),
                state: state.into(),
            })
            .collect();
        write_timeline(&path, &events).unwrap();

        let summary = analyze_timeline(&path, &SignalId::new("J0")).unwrap();
        assert!((summary["A"] - 40.0).abs() < 1e-9);
        assert!((summary["B"] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = b"{\"time\":0,\"signal_id\":\"J0\",\"state\":\"A\"}\n\
garbage\n\
{\"time\":10,\"signal_id\":\"J0\"}\n\
\xff\xfe\n\
{\"time\":12.5,\"signal_id\":\"J0\",\"state\":\"B\"}\n";
        let events = parse_timeline(&text[..], "J0");
        assert_eq!(events, vec![(0.0, "A".to_string()), (12.5, "B".to_string())]);
        assert!((average_by_state(&events).unwrap()["A"] - 12.5).abs() < 1e-9);
    }

    #[test]
    fn single_event_is_no_data() {
        assert!(average_by_state(&[(0.0, "A".into())]).is_none());
        assert!(average_by_state(&[]).is_none());
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        assert!(analyze_timeline(&dir.path().join("none.jsonl"), &SignalId::new("J0")).is_none());
    }

    #[test]
    fn backwards_time_clamps_to_zero() {
        let events = vec![(10.0, "A".to_string()), (5.0, "B".to_string())];
        assert!(average_by_state(&events).unwrap()["A"].abs() < f64::EPSILON);
    }
}
