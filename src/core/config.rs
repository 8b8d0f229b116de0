//! # Publisher configuration.
//!
//! Provides [`Config`] centralized settings for the [`Publisher`](crate::Publisher).
//!
//! ## Sentinel values
//! - `throttle_window = 0s` → throttling disabled (every publish dispatches)
//! - `grace = 0s` → `shutdown()` does not wait for detached dispatches

use std::time::Duration;

/// Default throttle window: the same event instance is dispatched at most once per 150 ms.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_millis(150);

/// Configuration for the publisher.
///
/// ## Field semantics
/// - `throttle_window`: how long a published instance suppresses republication of itself
/// - `grace`: maximum wait for in-flight detached dispatches on shutdown
#[derive(Clone, Debug)]
pub struct Config {
    /// Window during which republishing the very same event instance is a no-op.
    ///
    /// - `Duration::ZERO` = throttling disabled
    /// - `> 0` = one dispatch per instance per window
    pub throttle_window: Duration,

    /// Maximum time `shutdown()` waits for detached dispatches.
    ///
    /// If exceeded, `shutdown()` returns `DispatchError::GraceExceeded`; the
    /// dispatches keep running (there is no cancellation).
    pub grace: Duration,
}

impl Config {
    /// Returns the throttle window as an `Option`.
    ///
    /// - `None` → throttling disabled
    /// - `Some(d)` → instances are suppressed for `d` after publication
    #[inline]
    pub fn throttle_window(&self) -> Option<Duration> {
        if self.throttle_window == Duration::ZERO {
            None
        } else {
            Some(self.throttle_window)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `throttle_window = 150ms`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            throttle_window: DEFAULT_THROTTLE_WINDOW,
            grace: Duration::from_secs(30),
        }
    }
}
