//! `validate` command.

use crate::cli::args::ValidateArgs;
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::error::{ConfigError, PhaseTuneError, Severity, ValidationIssue};

/// Validate configuration files without running.
///
/// Every file is checked even after a failure; the first failure is
/// returned.
///
/// # Errors
///
/// Returns an I/O error if a file does not exist, or a config error if a
/// file does not load. With `--strict`, any warning is an error.
#[allow(clippy::unused_async)]
pub async fn run(args: &ValidateArgs) -> Result<(), PhaseTuneError> {
    let loader = ConfigLoader::new(LoaderOptions::default());
    let mut first_error = None;

    for path in &args.files {
        if !path.exists() {
            let err = PhaseTuneError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            ));
            eprintln!("{}: {err}", path.display());
            first_error.get_or_insert(err);
            continue;
        }
        tracing::info!(file = %path.display(), "validating configuration");

        match loader.load(path) {
            Ok(result) => {
                for warning in &result.warnings {
                    tracing::warn!(
                        location = warning.location.as_deref().unwrap_or("<unknown>"),
                        "{}",
                        warning.message
                    );
                    eprintln!("{}: warning: {warning}", path.display());
                }
                if args.strict && !result.warnings.is_empty() {
                    let errors = result
                        .warnings
                        .iter()
                        .map(|w| ValidationIssue {
                            path: w.location.clone().unwrap_or_default(),
                            message: w.message.clone(),
                            severity: Severity::Error,
                        })
                        .collect();
                    first_error.get_or_insert(PhaseTuneError::Config(
                        ConfigError::ValidationError {
                            path: path.display().to_string(),
                            errors,
                        },
                    ));
                    println!("{}: FAILED (strict)", path.display());
                } else {
                    println!("{}: OK", path.display());
                }
            }
            Err(e) => {
                if let ConfigError::ValidationError { errors, .. } = &e {
                    for issue in errors {
                        eprintln!("{}: {issue}", path.display());
                    }
                }
                println!("{}: FAILED ({e})", path.display());
                first_error.get_or_insert(e.into());
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}
