//! CLI argument definitions
//!
//! All Clap derive structs for `phasetune` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::ScanStrategy;
use crate::control::RunMode;
use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Adaptive traffic signal retiming driven by near-miss risk.
#[derive(Parser, Debug)]
#[command(name = "phasetune", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable logging. Results and the run summary are still printed.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "PHASETUNE_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "PHASETUNE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop against the bundled synthetic junction.
    Run(RunArgs),

    /// Validate configuration files without running.
    Validate(ValidateArgs),

    /// Summarize a state timeline written by a previous run.
    Analyze(AnalyzeArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "PHASETUNE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Optimize the signal or only observe it.
    #[arg(short, long, default_value = "opt")]
    pub mode: RunMode,

    /// Signal to control. Prompts (or picks the first) when omitted or unknown.
    #[arg(long, env = "PHASETUNE_TLS")]
    pub tls: Option<String>,

    /// Number of simulation steps (overrides configuration).
    #[arg(long)]
    pub steps: Option<u64>,

    /// Directory for run artifacts (overrides configuration).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Seed of the synthetic environment (overrides configuration).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pair enumeration strategy of the near-miss detector.
    #[arg(long)]
    pub scan: Option<ScanStrategy>,

    /// Write lifecycle events as JSONL to this file.
    #[arg(long, env = "PHASETUNE_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "PHASETUNE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `analyze`.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Timeline file (`timeline.jsonl`).
    pub timeline: PathBuf,

    /// Signal whose events are summarized.
    #[arg(long)]
    pub tls: String,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

// ============================================================================
// Tests
// ============================================================================
