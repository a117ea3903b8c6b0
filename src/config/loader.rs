//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and raw read (UTF-8 BOM stripped)
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing and deserialization to [`RunConfig`]
//! 4. `PHASETUNE_*` environment overrides
//! 5. Validation
//! 6. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::schema::{IntervalSpec, RunConfig};
use crate::config::validation::Validator;
use crate::error::ConfigError;

/// Overrides `simulation.steps`.
pub const STEPS_ENV: &str = "PHASETUNE_STEPS";

/// Overrides `simulation.optimize_interval` (step count or duration).
pub const OPTIMIZE_INTERVAL_ENV: &str = "PHASETUNE_OPTIMIZE_INTERVAL";

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: env_or("PHASETUNE_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<RunConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} ({loc})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or is too large
    /// - A required environment variable is unset
    /// - YAML parsing or deserialization fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_str(&raw, path)
    }

    /// Loads and validates configuration text; `origin` is used in messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file checks.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, origin)?;
        warnings.extend(env_sub.warnings);

        let value: serde_yaml::Value =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let config = if value.is_null() {
            warnings.push(LoadWarning {
                message: "Configuration file is empty, using defaults".to_string(),
                location: Some(origin.display().to_string()),
            });
            RunConfig::default()
        } else {
            serde_yaml::from_value(value).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: format!("Failed to deserialize configuration: {e}"),
            })?
        };

        Self::finish(config, &origin.display().to_string(), warnings, |name| {
            std::env::var(name).ok()
        })
    }

    /// Validates the built-in defaults with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override makes the
    /// configuration invalid.
    pub fn defaults(&self) -> Result<LoadResult, ConfigError> {
        Self::finish(RunConfig::default(), "<defaults>", Vec::new(), |name| {
            std::env::var(name).ok()
        })
    }

    fn finish<F>(
        mut config: RunConfig,
        origin: &str,
        mut warnings: Vec<LoadWarning>,
        lookup: F,
    ) -> Result<LoadResult, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        apply_env_overrides(&mut config, lookup, &mut warnings);

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.to_string(),
                errors: result.errors,
            });
        }
        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

/// Applies `PHASETUNE_STEPS` and `PHASETUNE_OPTIMIZE_INTERVAL`.
///
/// A step count that does not parse is ignored with a warning.
pub fn apply_env_overrides<F>(config: &mut RunConfig, lookup: F, warnings: &mut Vec<LoadWarning>)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(STEPS_ENV) {
        match raw.trim().parse::<u64>() {
            Ok(steps) => config.simulation.steps = steps,
            Err(_) => warnings.push(LoadWarning {
                message: format!("Ignoring {STEPS_ENV}={raw:?}: not a step count"),
                location: None,
            }),
        }
    }
    if let Some(raw) = lookup(OPTIMIZE_INTERVAL_ENV) {
        let raw = raw.trim();
        config.simulation.optimize_interval = raw
            .parse::<u64>()
            .map_or_else(|_| IntervalSpec::Duration(raw.to_string()), IntervalSpec::Steps);
    }
}

// ============================================================================
// Environment Substitution
// ============================================================================

struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = parse_var_spec(&mut chars, source_path)?;
                    match (std::env::var(&spec.name), spec.fallback) {
                        (Ok(value), _) => result.push_str(&value),
                        (Err(_), Some(Fallback::Default(value))) => result.push_str(&value),
                        (Err(_), Some(Fallback::Required(message))) => {
                            return Err(ConfigError::EnvVarNotSet {
                                var: spec.name,
                                location: message,
                            });
                        }
                        (Err(_), None) => self.warnings.push(LoadWarning {
                            message: format!(
                                "Environment variable '{}' is not set, using empty string",
                                spec.name
                            ),
                            location: Some(source_path.display().to_string()),
                        }),
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }
}

enum Fallback {
    Default(String),
    Required(String),
}

struct VarSpec {
    name: String,
    fallback: Option<Fallback>,
}

/// Parses the inside of `${...}` up to and including the closing brace.
fn parse_var_spec(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
) -> Result<VarSpec, ConfigError> {
    let mut name = String::new();
    while let Some(c) = chars.next() {
        match c {
            '}' => return Ok(VarSpec { name, fallback: None }),
            ':' => match chars.peek() {
                Some('-') => {
                    chars.next();
                    let value = read_until_close(chars, source_path)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Some(Fallback::Default(value)),
                    });
                }
                Some('?') => {
                    chars.next();
                    let message = read_until_close(chars, source_path)?;
                    return Ok(VarSpec {
                        name,
                        fallback: Some(Fallback::Required(message)),
                    });
                }
                _ => name.push(':'),
            },
            _ => name.push(c),
        }
    }
    Err(unclosed(source_path, &name))
}

/// Reads until the matching `}`, allowing nested braces.
fn read_until_close(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source_path: &Path,
) -> Result<String, ConfigError> {
    let mut value = String::new();
    let mut depth = 1;
    for c in chars.by_ref() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(value);
                }
            }
            _ => {}
        }
        value.push(c);
    }
    Err(unclosed(source_path, &value))
}

fn unclosed(source_path: &Path, fragment: &str) -> ConfigError {
    ConfigError::ParseError {
        path: PathBuf::from(source_path),
        line: None,
        message: format!("Unclosed environment variable reference near '{fragment}'"),
    }
}

/// Parses an environment variable with a default value.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
