//! Error types for `phasetune`
//!
//! One top-level error aggregates the domain errors and maps each of them
//! to a process exit code. Per-step faults inside the control loop are
//! returned as values and handled there; only startup and command-level
//! failures reach [`PhaseTuneError`].

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `phasetune` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Simulation environment error (no signals, step failure at startup)
    pub const SIMULATION_ERROR: i32 = 4;

    /// Optimizer error surfaced outside the control loop
    pub const OPTIMIZER_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `phasetune` operations.
#[derive(Debug, Error)]
pub enum PhaseTuneError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Simulation environment error
    #[error(transparent)]
    Simulation(#[from] SimError),

    /// Phase optimizer error
    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    /// Output artifact error
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Run stopped early by SIGINT
    #[error("interrupted")]
    Interrupted,

    /// Run stopped early by SIGTERM
    #[error("terminated")]
    Terminated,
}

impl PhaseTuneError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Simulation(_) => ExitCode::SIMULATION_ERROR,
            Self::Optimize(_) => ExitCode::OPTIMIZER_ERROR,
            Self::Output(_) | Self::Io(_) => ExitCode::IO_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Interrupted => ExitCode::INTERRUPTED,
            Self::Terminated => ExitCode::TERMINATED,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Dotted path to the problematic field (e.g., "optimizer.cycle_time")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Simulation Errors
// ============================================================================

/// Errors reported by a simulation environment.
///
/// [`SimError::StepFailed`] is fatal for a run; every other variant is a
/// transient access fault that the control loop absorbs for the current step.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// Advancing the simulation clock failed
    #[error("simulation step failed: {0}")]
    StepFailed(String),

    /// A per-vehicle query failed
    #[error("vehicle '{id}' not accessible: {reason}")]
    VehicleAccess {
        /// Vehicle identifier
        id: String,
        /// Reason reported by the environment
        reason: String,
    },

    /// A signal controller query or command failed
    #[error("signal '{signal}' rejected {operation}: {reason}")]
    SignalAccess {
        /// Signal identifier
        signal: String,
        /// Operation that failed (e.g. "set_program")
        operation: &'static str,
        /// Reason reported by the environment
        reason: String,
    },

    /// Signal id is not known to the environment
    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    /// Program id is not defined for the signal
    #[error("signal '{signal}' has no program '{program}'")]
    UnknownProgram {
        /// Signal identifier
        signal: String,
        /// Requested program identifier
        program: String,
    },

    /// The environment exposes no traffic signals
    #[error("no traffic signals available in the network")]
    NoSignals,
}

// ============================================================================
// Optimizer Errors
// ============================================================================

/// Phase optimizer errors.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// The integer plan cannot satisfy the bounds and cycle constraints
    #[error("cannot fit {phases} phases into a {cycle_time}s cycle within [{min}, {max}]")]
    Infeasible {
        /// Number of phases in the plan
        phases: usize,
        /// Target cycle time in seconds
        cycle_time: u32,
        /// Minimum phase duration
        min: u32,
        /// Maximum phase duration
        max: u32,
    },

    /// Solver output length did not match the plan
    #[error("solver returned {got} durations for {expected} phases")]
    ShapeMismatch {
        /// Number of phases in the plan
        expected: usize,
        /// Number of durations returned
        got: usize,
    },

    /// The new program definition could not be pushed to the controller
    #[error("commit of program '{program_id}' failed: {source}")]
    Commit {
        /// Program identifier that was minted for the commit
        program_id: String,
        /// Underlying controller error
        #[source]
        source: SimError,
    },

    /// Reading the current plan failed
    #[error("could not read current plan: {0}")]
    Plan(#[from] SimError),
}

// ============================================================================
// Output Errors
// ============================================================================

/// Errors raised while creating or reading run artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Output directory could not be prepared
    #[error("cannot prepare output directory {path}: {source}")]
    Directory {
        /// Directory path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// CSV read or write failed
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File path
        path: PathBuf,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// Plain I/O failure on an artifact
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `phasetune` operations.
pub type Result<T> = std::result::Result<T, PhaseTuneError>;

// ============================================================================
// Tests
// ============================================================================
