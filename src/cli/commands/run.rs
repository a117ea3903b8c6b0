//! `run` command: one control-loop run against the synthetic junction.

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use crate::cli::args::RunArgs;
use crate::cli::commands::analyze::write_state_averages;
use crate::cli::select::select_signal;
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::config::{RunConfig, Validator};
use crate::control::{ControlLoop, LoopSettings, RunReport, Shutdown};
use crate::error::{ConfigError, PhaseTuneError, SimError};
use crate::observability::{EventEmitter, StopReason};
use crate::optimizer::PhaseOptimizer;
use crate::output::{self, RunLogs};
use crate::risk::NearMissDetector;
use crate::sim::{SignalId, SyntheticEnvironment};

/// Run the control loop.
///
/// # Errors
///
/// Returns a config error for an invalid configuration, an I/O or output
/// error if the artifacts cannot be set up, a simulation error if no signal
/// is available or a step fails, and `Interrupted`/`Terminated` when a
/// signal stopped the run. Partial results are written in every case where
/// the loop ran.
pub async fn run(args: &RunArgs, shutdown: Shutdown) -> Result<(), PhaseTuneError> {
    let config = load_config(args)?;
    let interval = config.simulation.interval_steps()?;

    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    output::prepare_dir(&config.output.dir)?;

    let events = Arc::new(match args.events_file {
        Some(ref path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    });

    let mut env =
        SyntheticEnvironment::with_step_length(&config.synthetic, config.simulation.step_length);
    let signal = {
        let stdin = std::io::stdin();
        let interactive = stdin.is_terminal();
        let mut lock = stdin.lock();
        let input: Option<&mut dyn std::io::BufRead> = if interactive { Some(&mut lock) } else { None };
        select_signal(&env, args.tls.as_deref(), input, &mut std::io::stderr())?
    };

    let settings = LoopSettings {
        steps: config.simulation.steps,
        optimize_interval: interval,
        mode: args.mode,
    };
    let control = ControlLoop::new(
        signal.clone(),
        settings,
        NearMissDetector::new(&config.detector),
        PhaseOptimizer::new(config.optimizer.clone()),
    )
    .with_events(events)
    .with_shutdown(shutdown);

    let out = config.output.clone();
    let report = tokio::task::spawn_blocking(move || {
        let mut logs = RunLogs::create(&out.changes_path(), &out.observed_path(), &out.risk_path());
        control.run(&mut env, &mut logs)
    })
    .await
    .map_err(|e| PhaseTuneError::Io(std::io::Error::other(e)))?;

    let averages = if report.observations_logged {
        derive_timeline(&config, &signal)
    } else {
        discard_timeline(&config);
        None
    };
    print_report(&report, averages.as_ref())?;

    match report.stop_reason {
        StopReason::Completed => Ok(()),
        StopReason::Interrupted => Err(PhaseTuneError::Interrupted),
        StopReason::Terminated => Err(PhaseTuneError::Terminated),
        StopReason::SimulationFailed => Err(PhaseTuneError::Simulation(
            report
                .fatal
                .unwrap_or_else(|| SimError::StepFailed("simulation stopped".to_string())),
        )),
    }
}

/// Loads the file (or defaults) and applies command-line overrides.
fn load_config(args: &RunArgs) -> Result<RunConfig, PhaseTuneError> {
    let loader = ConfigLoader::new(LoaderOptions::default());
    let loaded = match args.config {
        Some(ref path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            loader.load(path)?
        }
        None => loader.defaults()?,
    };
    for warning in &loaded.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    let mut config = RunConfig::clone(&loaded.config);
    apply_cli_overrides(&mut config, args);

    let result = Validator::new().validate(&config);
    if result.has_errors() {
        return Err(ConfigError::ValidationError {
            path: "<command line>".to_string(),
            errors: result.errors,
        }
        .into());
    }
    Ok(config)
}

fn apply_cli_overrides(config: &mut RunConfig, args: &RunArgs) {
    if let Some(steps) = args.steps {
        config.simulation.steps = steps;
    }
    if let Some(ref dir) = args.output_dir {
        config.output.dir.clone_from(dir);
    }
    if let Some(seed) = args.seed {
        config.synthetic.seed = seed;
    }
    if let Some(scan) = args.scan {
        config.detector.scan = scan;
    }
}

/// Writes `timeline.jsonl` and returns its per-state averages.
fn derive_timeline(
    config: &RunConfig,
    signal: &SignalId,
) -> Option<std::collections::BTreeMap<String, f64>> {
    let timeline_path = config.output.timeline_path();
    let written = output::build_timeline(&config.output.observed_path(), signal)
        .and_then(|events| output::write_timeline(&timeline_path, &events));
    if let Err(e) = written {
        tracing::warn!(error = %e, "timeline not written");
        return None;
    }
    output::analyze_timeline(&timeline_path, signal)
}

/// Removes a timeline left by an earlier run in the same directory.
fn discard_timeline(config: &RunConfig) {
    let path = config.output.timeline_path();
    tracing::warn!(path = %path.display(), "observation log incomplete; timeline skipped");
    match std::fs::remove_file(&path) {
        Ok(()) => tracing::debug!(path = %path.display(), "stale timeline removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "cannot remove stale timeline"),
    }
}

fn print_report(
    report: &RunReport,
    averages: Option<&std::collections::BTreeMap<String, f64>>,
) -> Result<(), PhaseTuneError> {
    let mut out = std::io::stdout().lock();
    if report.stop_reason != StopReason::Completed {
        writeln!(out, "Run stopped early: {}", report.stop_reason)?;
    }
    writeln!(
        out,
        "Total delay: {}, Total near-miss: {}",
        report.summary.total_delay, report.summary.total_near_misses
    )?;
    write_state_averages(&mut out, averages)?;
    write!(out, "{}", report.phases)?;
    out.flush()?;
    Ok(())
}
