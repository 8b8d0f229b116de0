//! # Logging capability used by the failure sink.
//!
//! [`ErrorLog`] is the seam; [`TracingLog`] is the default and writes one
//! structured `tracing` event per failure:
//!
//! ```text
//! ERROR eventvisor: consumer failed event="app::OrderPlaced" consumer="notify" mode="async" label="consumer_failed" error=consumer failed: smtp down
//! ```

use crate::failures::DispatchFailure;

/// Logging capability.
///
/// Implementations may fail (panic); the sink absorbs that.
pub trait ErrorLog: Send + Sync + 'static {
    /// Records one failure.
    fn error(&self, message: &str, failure: &DispatchFailure);
}

/// [`ErrorLog`] backed by `tracing::error!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl TracingLog {
    /// Construct a new [`TracingLog`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ErrorLog for TracingLog {
    fn error(&self, message: &str, failure: &DispatchFailure) {
        tracing::error!(
            event = failure.event,
            consumer = failure.consumer,
            mode = failure.mode.as_label(),
            label = failure.error.as_label(),
            error = %failure.error,
            "{message}"
        );
    }
}
