//! Per-consumer failure record.

use std::fmt;

use crate::error::ConsumerError;

/// How a consumer was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// In-line on the publisher's thread.
    Sync,
    /// Inside a detached task.
    Async,
}

impl DispatchMode {
    /// Returns a short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchMode::Sync => "sync",
            DispatchMode::Async => "async",
        }
    }
}

/// One failed consumer invocation.
///
/// Built at the dispatch boundary and consumed immediately by the
/// [`FailureSink`](crate::FailureSink); never stored.
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    /// Type name of the published event.
    pub event: &'static str,
    /// Name of the failing consumer (`"resolve"` when the detached task could
    /// not resolve its consumers).
    pub consumer: &'static str,
    /// Sync or async invocation.
    pub mode: DispatchMode,
    /// What went wrong.
    pub error: ConsumerError,
}

impl DispatchFailure {
    /// Creates a failure record.
    pub fn new(
        event: &'static str,
        consumer: &'static str,
        mode: DispatchMode,
        error: ConsumerError,
    ) -> Self {
        Self {
            event,
            consumer,
            mode,
            error,
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} consumer '{}' failed on {}: {}",
            self.mode.as_label(),
            self.consumer,
            self.event,
            self.error
        )
    }
}
