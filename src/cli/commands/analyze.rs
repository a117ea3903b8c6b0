//! `analyze` command: per-state averages of a saved timeline.

use std::collections::BTreeMap;
use std::io::Write;

use crate::cli::args::AnalyzeArgs;
use crate::error::PhaseTuneError;
use crate::output::analyze_timeline;
use crate::sim::SignalId;

/// Summarize a timeline file.
///
/// A missing, empty, or malformed timeline is reported as "no data" and is
/// not an error.
///
/// # Errors
///
/// Returns a usage error for a blank `--tls` and an I/O error if the
/// summary cannot be written to stdout.
#[allow(clippy::unused_async)]
pub async fn run(args: &AnalyzeArgs) -> Result<(), PhaseTuneError> {
    let signal = requested_signal(&args.tls)?;
    tracing::info!(timeline = %args.timeline.display(), %signal, "analyzing timeline");
    let averages = analyze_timeline(&args.timeline, &signal);
    write_state_averages(&mut std::io::stdout().lock(), averages.as_ref())?;
    Ok(())
}

fn requested_signal(tls: &str) -> Result<SignalId, PhaseTuneError> {
    let tls = tls.trim();
    if tls.is_empty() {
        return Err(PhaseTuneError::Usage("--tls must name a signal".to_string()));
    }
    Ok(SignalId::new(tls))
}

/// Prints the timeline summary block shown after a run and by `analyze`.
pub(crate) fn write_state_averages(
    out: &mut dyn Write,
    averages: Option<&BTreeMap<String, f64>>,
) -> std::io::Result<()> {
    match averages {
        Some(states) => {
            writeln!(out, "Timeline summary (avg duration by state):")?;
            for (state, avg) in states {
                writeln!(out, "  {state}: {avg}s")?;
            }
        }
        None => writeln!(out, "Timeline summary: no data")?,
    }
    Ok(())
}
