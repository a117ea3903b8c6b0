//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod analyze;
pub mod run;
pub mod validate;

use crate::cli::args::{Cli, Commands};
use crate::control::Shutdown;
use crate::error::PhaseTuneError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, shutdown: Shutdown) -> Result<(), PhaseTuneError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, shutdown).await,
        Commands::Validate(args) => validate::run(&args).await,
        Commands::Analyze(args) => analyze::run(&args).await,
    }
}
