//! Publisher core: configuration, wiring, throttling and dispatch.
//!
//! The public API from this module is [`Publisher`] (built with
//! [`PublisherBuilder`]), its [`Config`], and the standalone [`ThrottleGuard`].
//!
//! Internal modules:
//! - [`config`]: throttle window and shutdown grace;
//! - [`builder`]: constructor-style injection of registry, scopes, log and runtime;
//! - [`throttle`]: per-instance debounce;
//! - [`publisher`]: sync in-line dispatch and detached async dispatch.

mod builder;
mod config;
mod publisher;
mod throttle;

pub use builder::PublisherBuilder;
pub use config::{Config, DEFAULT_THROTTLE_WINDOW};
pub use publisher::Publisher;
pub use throttle::ThrottleGuard;
