//! Interactive signal selection.

use std::io::{BufRead, Write};

use tracing::info;

use crate::error::SimError;
use crate::sim::{SignalController, SignalId};

/// Suggests the known signal closest to a mistyped id.
///
/// Returns the closest match if its Damerau-Levenshtein distance is ≤ 3.
#[must_use]
pub fn suggest_signal<'a>(input: &str, known: &'a [SignalId]) -> Option<&'a SignalId> {
    known
        .iter()
        .map(|id| (id, strsim::damerau_levenshtein(input, id.as_str())))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(id, _)| id)
}

/// Picks the signal to control.
///
/// A `requested` id known to the controller is used as is. Otherwise the
/// available signals are listed to `out`, and when `input` is given the
/// user may type a 1-based number. Empty, unreadable, or out-of-range
/// answers select the first signal.
///
/// # Errors
///
/// Returns [`SimError::NoSignals`] if the controller has no signals, or the
/// controller's error if the signal list cannot be read.
pub fn select_signal<C: SignalController + ?Sized>(
    ctl: &C,
    requested: Option<&str>,
    input: Option<&mut dyn BufRead>,
    out: &mut dyn Write,
) -> Result<SignalId, SimError> {
    let signals = ctl.signal_ids()?;
    let Some(first) = signals.first() else {
        return Err(SimError::NoSignals);
    };

    if let Some(wanted) = requested {
        if let Some(found) = signals.iter().find(|id| id.as_str() == wanted) {
            info!(signal = %found, "signal selected");
            return Ok(found.clone());
        }
        let _ = write!(out, "Signal '{wanted}' not found.");
        if let Some(hint) = suggest_signal(wanted, &signals) {
            let _ = write!(out, " Did you mean '{hint}'?");
        }
        let _ = writeln!(out);
    }

    list_signals(ctl, &signals, out);

    let chosen = input
        .and_then(|reader| prompt_choice(reader, out, signals.len()))
        .map_or(first, |index| &signals[index]);
    let _ = writeln!(out, "Selected signal: {chosen}");
    if chosen.is_cluster() {
        let _ = writeln!(
            out,
            "Note: '{chosen}' is a joined cluster; the whole cluster is retimed as one signal."
        );
    }
    info!(signal = %chosen, "signal selected");
    Ok(chosen.clone())
}

fn list_signals<C: SignalController + ?Sized>(ctl: &C, signals: &[SignalId], out: &mut dyn Write) {
    let _ = writeln!(out, "Available signals:");
    for (i, id) in signals.iter().enumerate() {
        let tag = if id.is_cluster() { " (cluster)" } else { "" };
        let _ = writeln!(out, "{}. {id}{tag}", i + 1);
        if id.is_cluster() {
            let _ = writeln!(out, "   junctions: {}", id.cluster_members().join(", "));
        }
        match (ctl.controlled_lanes(id), ctl.signal_state(id)) {
            (Ok(lanes), Ok(state)) => {
                let _ = writeln!(out, "   controlled lanes: {}", lanes.len());
                let _ = writeln!(out, "   current state: {state}");
            }
            (Err(e), _) | (_, Err(e)) => {
                let _ = writeln!(out, "   details unavailable: {e}");
            }
        }
    }
}

/// Reads a 1-based choice; `None` means "use the first".
fn prompt_choice(input: &mut dyn BufRead, out: &mut dyn Write, count: usize) -> Option<usize> {
    let _ = write!(out, "Choose a signal number (Enter for the first): ");
    let _ = out.flush();
    let mut line = String::new();
    input.read_line(&mut line).ok()?;
    let answer = line.trim();
    if answer.is_empty() {
        return None;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Some(n - 1),
        _ => {
            let _ = writeln!(out, "Invalid choice; using the first signal.");
            None
        }
    }
}
