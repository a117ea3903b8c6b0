//! Run artifacts
//!
//! CSV logs written while the control loop runs, and the state timeline
//! derived from them afterwards.

pub mod tabular;
pub mod timeline;

use std::path::Path;

use crate::error::OutputError;

pub use tabular::{CsvLog, RunLogs};
pub use timeline::{TimelineEvent, analyze_timeline, build_timeline, write_timeline};

/// Creates the output directory if it does not exist.
///
/// # Errors
///
/// Returns [`OutputError::Directory`] if the directory cannot be created.
pub fn prepare_dir(dir: &Path) -> Result<(), OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Directory {
        path: dir.to_path_buf(),
        source,
    })
}
