//! Observability
//!
//! Logging, metrics, and the structured JSONL event stream for control-loop
//! runs.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter, RunSummary, StopReason};
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
