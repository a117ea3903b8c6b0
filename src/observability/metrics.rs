//! Prometheus-compatible run metrics.
//!
//! All `record_*` and `set_*` functions are no-ops until [`init_metrics`]
//! installs a recorder.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::PhaseTuneError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `PhaseTuneError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), PhaseTuneError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| PhaseTuneError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "phasetune_steps_total",
        "Simulation steps completed"
    );
    describe_counter!(
        "phasetune_near_misses_total",
        "Vehicle pairs below the time-to-collision threshold"
    );
    describe_counter!(
        "phasetune_optimizations_total",
        "Optimizer calls by outcome"
    );
    describe_counter!(
        "phasetune_phase_switches_total",
        "Observed phase switches"
    );
    describe_counter!(
        "phasetune_lost_observations_total",
        "Steps where the active phase could not be read"
    );
    describe_counter!(
        "phasetune_log_stream_failures_total",
        "Output streams disabled after a write failure"
    );
    describe_gauge!("phasetune_epoch", "Current optimization epoch");
    describe_gauge!(
        "phasetune_interval_avg_risk",
        "Mean per-step risk over the last optimization interval"
    );
    describe_gauge!("phasetune_sim_time_seconds", "Simulation clock");
}

/// Records one completed simulation step.
pub fn record_step(sim_time: f64) {
    counter!("phasetune_steps_total").increment(1);
    gauge!("phasetune_sim_time_seconds").set(sim_time);
}

/// Records near misses detected in one step.
pub fn record_near_misses(count: u64) {
    if count > 0 {
        counter!("phasetune_near_misses_total").increment(count);
    }
}

/// Records an optimizer call; `outcome` is `committed`, `unchanged` or
/// `failed`.
pub fn record_optimization(outcome: &'static str) {
    counter!("phasetune_optimizations_total", "outcome" => outcome).increment(1);
}

/// Records an observed phase switch.
pub fn record_phase_switch(phase_index: usize) {
    counter!("phasetune_phase_switches_total", "phase" => phase_index.to_string()).increment(1);
}

/// Records a step whose phase observation failed.
pub fn record_lost_observation() {
    counter!("phasetune_lost_observations_total").increment(1);
}

/// Records an output stream being disabled.
pub fn record_log_stream_failure(stream: &'static str) {
    counter!("phasetune_log_stream_failures_total", "stream" => stream).increment(1);
}

/// Sets the current epoch gauge.
pub fn set_epoch(epoch: u32) {
    gauge!("phasetune_epoch").set(f64::from(epoch));
}

/// Sets the interval average risk gauge.
pub fn set_interval_risk(avg_risk: f64) {
    gauge!("phasetune_interval_avg_risk").set(avg_risk);
}
