//! Error types used by the publisher and by consumers.
//!
//! This module defines two main error enums:
//!
//! - [`DispatchError`] - wiring errors raised by the publisher itself (the only errors
//!   [`Publisher::publish`](crate::Publisher::publish) ever returns).
//! - [`ConsumerError`] - errors raised by individual consumer invocations. These are
//!   always caught at the dispatch boundary and routed to the failure sink.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the publisher.
///
/// These represent wiring defects: no dispatch is possible and recovery is the
/// application's job, so they propagate to the caller of `publish`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A resolution scope could not be opened.
    #[error("resolution scope unavailable: {reason}")]
    ScopeUnavailable {
        /// Why the scope factory refused.
        reason: String,
    },

    /// A consumer factory asked the scope for a dependency that was never seeded.
    #[error("consumer '{consumer}' requires missing dependency '{dependency}'")]
    MissingDependency {
        /// Type name of the requested dependency.
        dependency: &'static str,
        /// Name of the consumer (or `"scope"` when requested directly).
        consumer: &'static str,
    },

    /// No tokio runtime was available to run detached dispatches.
    #[error("no tokio runtime available for detached dispatch")]
    NoRuntime,

    /// Shutdown grace period elapsed with detached dispatches still running.
    #[error("shutdown timeout {grace:?} exceeded; {in_flight} detached dispatches still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Detached dispatches still in flight.
        in_flight: usize,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::DispatchError;
    ///
    /// assert_eq!(DispatchError::NoRuntime.as_label(), "dispatch_no_runtime");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::ScopeUnavailable { .. } => "dispatch_scope_unavailable",
            DispatchError::MissingDependency { .. } => "dispatch_missing_dependency",
            DispatchError::NoRuntime => "dispatch_no_runtime",
            DispatchError::GraceExceeded { .. } => "dispatch_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatchError::ScopeUnavailable { reason } => format!("scope: {reason}"),
            DispatchError::MissingDependency {
                dependency,
                consumer,
            } => format!("missing {dependency} for {consumer}"),
            DispatchError::NoRuntime => "no runtime".to_string(),
            DispatchError::GraceExceeded { grace, in_flight } => {
                format!("grace exceeded after {grace:?}; in flight={in_flight}")
            }
        }
    }
}

/// # Errors produced by a consumer invocation.
///
/// Returned from `handle_event` or synthesized by the dispatcher when a consumer
/// panics. Never surfaces to the publisher.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumerError {
    /// The consumer reported a failure.
    #[error("consumer failed: {message}")]
    Failed {
        /// The underlying error message.
        message: String,
    },

    /// The consumer panicked; the panic was caught at the dispatch boundary.
    #[error("consumer panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The detached dispatch could not resolve its consumers.
    #[error("consumer resolution failed: {0}")]
    Resolution(DispatchError),
}

impl ConsumerError {
    /// Shorthand for [`ConsumerError::Failed`].
    pub fn fail(message: impl Into<String>) -> Self {
        ConsumerError::Failed {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use eventvisor::ConsumerError;
    ///
    /// assert_eq!(ConsumerError::fail("boom").as_label(), "consumer_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConsumerError::Failed { .. } => "consumer_failed",
            ConsumerError::Panicked { .. } => "consumer_panicked",
            ConsumerError::Resolution(_) => "consumer_resolution_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ConsumerError::Failed { message } => format!("error: {message}"),
            ConsumerError::Panicked { info } => format!("panic: {info}"),
            ConsumerError::Resolution(err) => format!("resolution: {}", err.as_message()),
        }
    }

    /// Builds a [`ConsumerError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        ConsumerError::Panicked { info }
    }
}

impl From<String> for ConsumerError {
    fn from(message: String) -> Self {
        ConsumerError::Failed { message }
    }
}

impl From<&str> for ConsumerError {
    fn from(message: &str) -> Self {
        ConsumerError::fail(message)
    }
}

impl From<DispatchError> for ConsumerError {
    fn from(err: DispatchError) -> Self {
        ConsumerError::Resolution(err)
    }
}
