//! # Function-backed consumers (`ConsumerFn`, `AsyncConsumerFn`)
//!
//! Wrap a closure so ad-hoc handlers can be registered without declaring a type.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{AsyncConsumerFn, ConsumerError, ConsumerFn};
//!
//! struct OrderPlaced { order_id: u64 }
//!
//! let log = ConsumerFn::arc("log", |ev: &OrderPlaced| {
//!     println!("order {}", ev.order_id);
//!     Ok::<_, ConsumerError>(())
//! });
//!
//! let notify = AsyncConsumerFn::arc("notify", |ev: Arc<OrderPlaced>| async move {
//!     let _ = ev.order_id;
//!     Ok::<_, ConsumerError>(())
//! });
//! # let _ = (log, notify);
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::consumers::{AsyncConsumer, Consumer};
use crate::error::ConsumerError;
use crate::events::Event;

/// Closure-backed synchronous consumer.
#[derive(Debug)]
pub struct ConsumerFn<F> {
    name: &'static str,
    f: F,
}

impl<F> ConsumerFn<F> {
    /// Creates a new function-backed consumer.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the consumer and returns it behind an `Arc`.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<E, F> Consumer<E> for ConsumerFn<F>
where
    E: Event,
    F: Fn(&E) -> Result<(), ConsumerError> + Send + Sync + 'static,
{
    fn handle_event(&self, event: &E) -> Result<(), ConsumerError> {
        (self.f)(event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Closure-backed asynchronous consumer.
///
/// The closure *creates* a new future per event.
#[derive(Debug)]
pub struct AsyncConsumerFn<F> {
    name: &'static str,
    f: F,
}

impl<F> AsyncConsumerFn<F> {
    /// Creates a new function-backed async consumer.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the consumer and returns it behind an `Arc`.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<E, F, Fut> AsyncConsumer<E> for AsyncConsumerFn<F>
where
    E: Event,
    F: Fn(Arc<E>) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), ConsumerError>> + Send + 'static,
{
    async fn handle_event(&self, event: Arc<E>) -> Result<(), ConsumerError> {
        (self.f)(event).await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
