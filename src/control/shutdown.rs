//! Cooperative shutdown shared between the signal handler and the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

use crate::observability::StopReason;

const NONE: u8 = 0;
const INTERRUPTED: u8 = 1;
const TERMINATED: u8 = 2;

/// Cancellation token plus the reason it was cancelled.
///
/// Cloning yields a handle to the same shutdown state. Only the first
/// request records its reason.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    cause: Arc<AtomicU8>,
}

impl Shutdown {
    /// Creates a handle that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown after SIGINT.
    pub fn interrupt(&self) {
        self.request(INTERRUPTED);
    }

    /// Requests shutdown after SIGTERM.
    pub fn terminate(&self) {
        self.request(TERMINATED);
    }

    fn request(&self, cause: u8) {
        let _ = self
            .cause
            .compare_exchange(NONE, cause, Ordering::SeqCst, Ordering::SeqCst);
        self.token.cancel();
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop reason matching the request, if any.
    ///
    /// A token cancelled directly through [`Shutdown::token`] reports
    /// [`StopReason::Interrupted`].
    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        if !self.is_requested() {
            return None;
        }
        Some(match self.cause.load(Ordering::SeqCst) {
            TERMINATED => StopReason::Terminated,
            _ => StopReason::Interrupted,
        })
    }

    /// Underlying cancellation token.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}
