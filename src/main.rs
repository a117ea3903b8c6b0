//! `phasetune` - Adaptive traffic signal retiming driven by near-miss risk

use clap::Parser;

use phasetune::cli::args::Cli;
use phasetune::cli::commands;
use phasetune::control::Shutdown;
use phasetune::error::{ExitCode, PhaseTuneError};
use phasetune::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    let shutdown = Shutdown::new();

    // Spawn signal handler for graceful shutdown
    let handle = shutdown.clone();
    tokio::spawn(async move {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    None
                }
            };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => handle.interrupt(),
            Some(()) = recv(sigterm.as_mut()) => handle.terminate(),
        }

        eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            Some(()) = recv(sigterm.as_mut()) => std::process::exit(ExitCode::TERMINATED),
        }
    });

    let result = commands::dispatch(cli, shutdown).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e @ (PhaseTuneError::Interrupted | PhaseTuneError::Terminated)) => {
            std::process::exit(e.exit_code());
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Waits for SIGTERM, or forever when no handler could be registered.
async fn recv(sigterm: Option<&mut tokio::signal::unix::Signal>) -> Option<()> {
    match sigterm {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}
