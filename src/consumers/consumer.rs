//! # Consumer traits.
//!
//! Provides [`Consumer`] and [`AsyncConsumer`], the extension points for
//! plugging handlers into the publisher.
//!
//! ## Rules
//! - A consumer is bound to exactly one event type (the trait parameter `E`).
//! - Errors are reported by returning `Err`; panics are caught as well.
//! - A failing consumer never affects its siblings or the publisher.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use eventvisor::{AsyncConsumer, Consumer, ConsumerError};
//!
//! struct OrderPlaced { order_id: u64 }
//!
//! struct InvalidateCache;
//!
//! impl Consumer<OrderPlaced> for InvalidateCache {
//!     fn handle_event(&self, ev: &OrderPlaced) -> Result<(), ConsumerError> {
//!         let _ = ev.order_id;
//!         Ok(())
//!     }
//!     fn name(&self) -> &'static str { "invalidate-cache" }
//! }
//!
//! struct Notify;
//!
//! #[async_trait]
//! impl AsyncConsumer<OrderPlaced> for Notify {
//!     async fn handle_event(&self, ev: Arc<OrderPlaced>) -> Result<(), ConsumerError> {
//!         if ev.order_id == 0 {
//!             return Err(ConsumerError::fail("empty order"));
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ConsumerError;
use crate::events::Event;

/// Synchronous event consumer.
///
/// Invoked on the publisher's thread, in registration order, before
/// [`Publisher::publish`](crate::Publisher::publish) returns. Use it when the
/// caller depends on the side effect (cache invalidation and the like).
///
/// ### Implementation requirements
/// - Keep it short; the publisher's caller is waiting.
/// - Return `Err` instead of panicking (panics are caught, but cost more).
pub trait Consumer<E: Event>: Send + Sync + 'static {
    /// Handles one event.
    fn handle_event(&self, event: &E) -> Result<(), ConsumerError>;

    /// Returns the consumer name used in failure records.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Asynchronous event consumer.
///
/// Invoked from a detached task; `publish` does not wait for it. Consumers of
/// one detached dispatch run sequentially in registration order.
///
/// The event is handed over as an owned `Arc` since the work outlives the
/// publisher's call.
#[async_trait]
pub trait AsyncConsumer<E: Event>: Send + Sync + 'static {
    /// Handles one event.
    async fn handle_event(&self, event: Arc<E>) -> Result<(), ConsumerError>;

    /// Returns the consumer name used in failure records.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
