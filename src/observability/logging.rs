//! Logging initialization.
//!
//! Log lines go to stderr so stdout carries only the run report and the
//! timeline summary. At `-v` the run lifecycle shows up: config loading,
//! control loop start and stop, committed plans. `-vv` adds per-switch
//! observations, skipped vehicles and log-stream detail from this crate
//! only; dependencies stay at `info`. `-vvv` traces this crate.
//!
//! `PHASETUNE_LOG_LEVEL` replaces the mapping with an arbitrary `EnvFilter`
//! directive, e.g. `phasetune::optimizer=trace`.

use std::io::IsTerminal;

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_LEVEL_ENV: &str = "PHASETUNE_LOG_LEVEL";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// One line per event, colored on a terminal.
    #[default]
    Human,
    /// One JSON object per event.
    Json,
}

/// `EnvFilter` directive for a `-v` count.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "info,phasetune=debug",
        _ => "info,phasetune=trace",
    }
}

/// Whether human log lines get ANSI colors.
///
/// `Auto` colors only an interactive stderr without `NO_COLOR`.
#[must_use]
pub const fn ansi_enabled(color: ColorChoice, stderr_is_terminal: bool, no_color: bool) -> bool {
    match color {
        ColorChoice::Auto => stderr_is_terminal && !no_color,
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Installs the global subscriber; later calls leave the first one in place.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)));
    // Module paths only help once per-crate debug output is on.
    let show_target = verbosity >= 2;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(show_target)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder
            .with_ansi(ansi_enabled(
                color,
                std::io::stderr().is_terminal(),
                std::env::var_os("NO_COLOR").is_some(),
            ))
            .try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
