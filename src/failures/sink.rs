//! # FailureSink - bottom of every error path.
//!
//! [`FailureSink::record`] never panics and never returns an error:
//! - no [`ErrorLog`] configured → the failure is dropped;
//! - the log panics → the panic is caught and the failure is dropped;
//! - otherwise the failure is counted as recorded.
//!
//! Counters are exposed for observability and tests.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::failures::{DispatchFailure, ErrorLog};

/// Best-effort failure recorder.
pub struct FailureSink {
    log: Option<Arc<dyn ErrorLog>>,
    recorded: AtomicU64,
    dropped: AtomicU64,
}

impl FailureSink {
    /// Creates a sink forwarding to `log` (if any).
    #[must_use]
    pub fn new(log: Option<Arc<dyn ErrorLog>>) -> Self {
        Self {
            log,
            recorded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Records one failure. Unconditionally safe to call.
    pub fn record(&self, failure: DispatchFailure) {
        let Some(log) = &self.log else {
            self.dropped.fetch_add(1, AtomicOrdering::Relaxed);
            return;
        };

        let message = failure.error.as_message();
        match catch_unwind(AssertUnwindSafe(|| log.error(&message, &failure))) {
            Ok(()) => {
                self.recorded.fetch_add(1, AtomicOrdering::Relaxed);
            }
            Err(_) => {
                self.dropped.fetch_add(1, AtomicOrdering::Relaxed);
            }
        }
    }

    /// Failures successfully handed to the log.
    pub fn recorded(&self) -> u64 {
        self.recorded.load(AtomicOrdering::Relaxed)
    }

    /// Failures lost because the log was absent or failed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(AtomicOrdering::Relaxed)
    }
}

impl std::fmt::Debug for FailureSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureSink")
            .field("has_log", &self.log.is_some())
            .field("recorded", &self.recorded())
            .field("dropped", &self.dropped())
            .finish()
    }
}
