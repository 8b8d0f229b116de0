//! Domain events: the publishable marker trait and instance identity.
//!
//! ## Contents
//! - [`Event`] marker trait for anything that can be published
//! - [`EventKey`] identity of one published instance (used by the throttle guard)
//!
//! Events are published as `Arc<E>`. Consumers are selected by the runtime type
//! `E`; throttling keys on the `Arc` allocation, never on the content.

mod event;

pub use event::{Event, EventKey, event_name};
