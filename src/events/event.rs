//! # Publishable events and their identity.
//!
//! Any `Send + Sync + 'static` value is an [`Event`]. Consumers are bound to the
//! concrete type, so publishing `Arc<OrderPlaced>` reaches only consumers
//! registered for `OrderPlaced`.
//!
//! ## Identity
//! Two events with identical fields are **different** events. [`EventKey`] is
//! derived from the address of the shared allocation, so only republishing the
//! very same `Arc` (or a clone of it) is recognised as a duplicate.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::EventKey;
//!
//! #[derive(Debug, PartialEq)]
//! struct OrderPlaced { order_id: u64 }
//!
//! let a = Arc::new(OrderPlaced { order_id: 42 });
//! let b = Arc::new(OrderPlaced { order_id: 42 });
//!
//! assert_eq!(a, b);
//! assert_ne!(EventKey::of(&a), EventKey::of(&b));
//! assert_eq!(EventKey::of(&a), EventKey::of(&Arc::clone(&a)));
//! ```

use std::any::Any;
use std::sync::Arc;

/// Marker for values that can be published.
///
/// Blanket-implemented; there is nothing to implement by hand.
pub trait Event: Any + Send + Sync {}

impl<T: Any + Send + Sync> Event for T {}

/// Identity of one published event instance.
///
/// Only meaningful while the allocation is alive; the throttle guard keeps the
/// `Arc` pinned for as long as the key is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey(usize);

impl EventKey {
    /// Returns the identity of the instance behind `event`.
    pub fn of<E: Event>(event: &Arc<E>) -> Self {
        Self(Arc::as_ptr(event).cast::<()>() as usize)
    }
}

/// Returns the name used for `E` in logs and failure records.
#[inline]
pub fn event_name<E: Event>() -> &'static str {
    std::any::type_name::<E>()
}
