mod common;

use std::process::Command;

use common::{csv_rows, run_phasetune};

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// run command
// ============================================================================

#[test]
fn run_writes_all_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(
        tmp.path(),
        &["run", "--steps", "700", "--tls", "J0", "--output-dir", "out", "--quiet"],
    );
    assert!(output.status.success(), "run should exit 0: {}", stderr(&output));

    let out = tmp.path().join("out");
    for name in ["tls_changes.csv", "tls_observed.csv", "risk_trend.csv", "timeline.jsonl"] {
        assert!(out.join(name).exists(), "{name} missing");
    }
    assert_eq!(csv_rows(&out.join("tls_changes.csv")).len(), 2);
    assert_eq!(csv_rows(&out.join("risk_trend.csv")).len(), 700);

    let text = stdout(&output);
    assert!(text.contains("Total delay:"), "stdout: {text}");
    assert!(text.contains("Total near-miss:"), "stdout: {text}");
    assert!(text.contains("Timeline summary"), "stdout: {text}");
    assert!(text.contains("after optimization #1"), "stdout: {text}");
}

#[test]
fn quiet_drops_logs_but_keeps_report() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(
        tmp.path(),
        &["run", "--steps", "50", "--tls", "J0", "-o", "out", "-q", "-vv"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).is_empty(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Total delay:"));
}

#[test]
fn unwritable_observation_log_skips_stale_timeline() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");
    std::fs::create_dir_all(out.join("tls_observed.csv")).unwrap();
    std::fs::write(
        out.join("timeline.jsonl"),
        "{\"time\":0.0,\"signal_id\":\"J0\",\"state\":\"stale\"}\n{\"time\":9.0,\"signal_id\":\"J0\",\"state\":\"stale\"}\n",
    )
    .unwrap();

    let output = run_phasetune(tmp.path(), &["run", "--steps", "400", "--tls", "J0", "-o", "out", "-q"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Timeline summary: no data"), "stdout: {text}");
    assert!(!text.contains("stale"), "stdout: {text}");
    assert!(!out.join("timeline.jsonl").exists());
    assert_eq!(csv_rows(&out.join("risk_trend.csv")).len(), 400);
}

#[test]
fn baseline_run_never_commits() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(
        tmp.path(),
        &["run", "--mode", "baseline", "--steps", "700", "--tls", "J0", "-o", "out"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(csv_rows(&tmp.path().join("out/tls_changes.csv")).is_empty());
    assert!(!stdout(&output).contains("after optimization"));
}

#[test]
fn unknown_signal_suggests_and_falls_back() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(tmp.path(), &["run", "--steps", "20", "--tls", "J9", "-o", "out"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let err = stderr(&output);
    assert!(err.contains("Did you mean 'J0'?"), "stderr: {err}");
    assert!(err.contains("Available signals:"), "stderr: {err}");
    assert!(err.contains("Selected signal: J0"), "stderr: {err}");
}

#[test]
fn events_file_brackets_run() {
    let tmp = tempfile::tempdir().unwrap();
    let events = tmp.path().join("events.jsonl");
    let output = run_phasetune(
        tmp.path(),
        &[
            "run",
            "--steps",
            "400",
            "--tls",
            "J0",
            "-o",
            "out",
            "--events-file",
            events.to_str().unwrap(),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&events)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("invalid JSON: {e}\nline: {l}")))
        .collect();
    assert_eq!(lines.first().unwrap()["type"], "RunStarted");
    assert_eq!(lines.last().unwrap()["type"], "RunStopped");
    assert_eq!(lines.last().unwrap()["reason"], "completed");
    assert!(lines.iter().any(|l| l["type"] == "OptimizationApplied"));

    let sequences: Vec<u64> = lines.iter().map(|l| l["sequence"].as_u64().unwrap()).collect();
    assert!(sequences.windows(2).all(|w| w[1] > w[0]), "{sequences:?}");
}

#[test]
fn config_file_and_env_override() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("run.yaml");
    std::fs::write(
        &config,
        "simulation:\n  steps: 5000\n  optimize_interval: 2m\noutput:\n  dir: ${RUN_DIR:-fallback}\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_phasetune"))
        .args(["run", "--tls", "J0", "--config", config.to_str().unwrap()])
        .current_dir(tmp.path())
        .env("PHASETUNE_STEPS", "250")
        .env("RUN_DIR", "from_env")
        .env_remove("PHASETUNE_OPTIMIZE_INTERVAL")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", stderr(&output));

    let out = tmp.path().join("from_env");
    assert_eq!(csv_rows(&out.join("risk_trend.csv")).len(), 250);
    // 2m at 1 s/step: optimizations at steps 120 and 240.
    assert_eq!(csv_rows(&out.join("tls_changes.csv")).len(), 2);
}

#[test]
fn invalid_config_exits_with_config_code() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("bad.yaml");
    std::fs::write(&config, "optimizer:\n  min_phase_duration: 70\n  max_phase_duration: 60\n").unwrap();

    let output = run_phasetune(tmp.path(), &["run", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2), "{}", stderr(&output));
}

// ============================================================================
// validate command
// ============================================================================

#[test]
fn validate_accepts_good_file() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("good.yaml");
    std::fs::write(&config, "detector:\n  scan: grid\n").unwrap();

    let output = run_phasetune(tmp.path(), &["validate", config.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("OK"));
}

#[test]
fn validate_reports_every_file() {
    let tmp = tempfile::tempdir().unwrap();
    let good = tmp.path().join("good.yaml");
    let bad = tmp.path().join("bad.yaml");
    std::fs::write(&good, "simulation:\n  steps: 100\n").unwrap();
    std::fs::write(&bad, "optimizer:\n  cycle_time: 0\n").unwrap();

    let output = run_phasetune(
        tmp.path(),
        &["validate", bad.to_str().unwrap(), good.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(2));
    let text = stdout(&output);
    assert!(text.contains("bad.yaml: FAILED"), "stdout: {text}");
    assert!(text.contains("good.yaml: OK"), "stdout: {text}");
}

#[test]
fn validate_missing_file_is_io_error() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(tmp.path(), &["validate", "does-not-exist.yaml"]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn validate_strict_fails_on_warnings() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("warn.yaml");
    // Interval longer than the run is only a warning.
    std::fs::write(&config, "simulation:\n  steps: 100\n  optimize_interval: 500\n").unwrap();

    let lenient = run_phasetune(tmp.path(), &["validate", config.to_str().unwrap()]);
    assert!(lenient.status.success(), "{}", stderr(&lenient));

    let strict = run_phasetune(tmp.path(), &["validate", "--strict", config.to_str().unwrap()]);
    assert_eq!(strict.status.code(), Some(2));
}

// ============================================================================
// analyze command
// ============================================================================

#[test]
fn analyze_after_run() {
    let tmp = tempfile::tempdir().unwrap();
    let run = run_phasetune(tmp.path(), &["run", "--steps", "400", "--tls", "J0", "-o", "out", "-q"]);
    assert!(run.status.success(), "{}", stderr(&run));

    let output = run_phasetune(tmp.path(), &["analyze", "out/timeline.jsonl", "--tls", "J0"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Timeline summary (avg duration by state):"), "stdout: {text}");
    assert!(text.contains("rrGG"), "stdout: {text}");
}

#[test]
fn analyze_missing_timeline_is_no_data() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(tmp.path(), &["analyze", "missing.jsonl", "--tls", "J0"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("no data"));
}

#[test]
fn analyze_blank_signal_is_usage_error() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(tmp.path(), &["analyze", "timeline.jsonl", "--tls", " "]);
    assert_eq!(output.status.code(), Some(64), "{}", stderr(&output));
    assert!(stderr(&output).contains("usage error"));
}

// ============================================================================
// usage
// ============================================================================

#[test]
fn unknown_subcommand_is_usage_error() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(tmp.path(), &["retime"]);
    assert!(!output.status.success());
}

#[test]
fn version_flag_prints_name() {
    let tmp = tempfile::tempdir().unwrap();
    let output = run_phasetune(tmp.path(), &["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("phasetune"));
}
