//! Cooperative cancellation signal.
//!
//! A [`CancelToken`] is a cheap, cloneable flag shared between the caller,
//! the job pool, and in-flight agent subprocess runners. Cancellation is
//! cooperative: once the flag is set, no new jobs are claimed and running
//! subprocesses are asked to terminate (graceful signal first, force-kill
//! after a grace window). The flag is never reset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared one-way cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
