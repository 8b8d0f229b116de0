//! # eventvisor
//!
//! **Eventvisor** is an in-process domain event publisher for Rust.
//!
//! It broadcasts an application event to every consumer registered for the
//! event's type. Synchronous consumers run on the caller's thread before
//! `publish` returns; asynchronous consumers run detached on the tokio runtime.
//! Consumer failures never reach the publisher, and rapid republication of the
//! very same event instance is throttled.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ── publish(Arc<E>) ──►┌──────────────────────────────────────────────┐
//!                                │  Publisher                                   │
//!                                │  - ThrottleGuard (instance identity, 150ms)  │
//!                                │  - ScopeFactory  (fresh resolution scopes)   │
//!                                │  - FailureSink   (best-effort ErrorLog)      │
//!                                │  - TaskTracker   (detached dispatches)       │
//!                                └──────┬───────────────────────────┬───────────┘
//!                                       │ caller's thread           │ tokio::spawn (not awaited)
//!                                       ▼                           ▼
//!                           Scope::sync_consumers::<E>()   begin_scope() ─► async_consumers::<E>()
//!                                       │                           │
//!                              ┌────────┼────────┐          ┌───────┼───────┐
//!                              ▼        ▼        ▼          ▼       ▼       ▼
//!                             C1       C2       CN         A1 ──► A2 ──► AN   (sequential)
//!                              │ Err / panic                │ Err / panic
//!                              └──────────► FailureSink ◄───┘
//!                                               │
//!                                               └─► ErrorLog::error()  (absent / panicking → dropped)
//! ```
//!
//! ### Publish lifecycle
//! ```text
//! publish(event)
//!   ├─► throttle: same instance within window ─► Ok(()) (no dispatch)
//!   ├─► begin_scope()                           ─► Err only on wiring defects
//!   ├─► async consumers registered?  ─► spawn detached task (own scope, sequential, guarded)
//!   └─► sync consumers in registration order, each guarded ─► Ok(())
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------------|---------------------------------------------|
//! | **Consumers**     | Sync and async handlers bound to one event type.                | [`Consumer`], [`AsyncConsumer`]             |
//! | **Registry**      | Explicit startup registration, per-scope resolution.            | [`Registry`], [`RegistryBuilder`], [`Scope`]|
//! | **Publishing**    | Throttled, failure-isolated dispatch.                           | [`Publisher`], [`PublisherBuilder`]         |
//! | **Throttling**    | Instance-identity debounce.                                     | [`ThrottleGuard`], [`EventKey`]             |
//! | **Failures**      | Per-consumer failure records, never-panicking sink.             | [`FailureSink`], [`ErrorLog`]               |
//! | **Errors**        | Typed errors for wiring and consumer failures.                  | [`DispatchError`], [`ConsumerError`]        |
//! | **Configuration** | Throttle window and shutdown grace.                             | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{ConsumerError, Publisher, Registry};
//!
//! #[derive(Debug)]
//! struct OrderPlaced { order_id: u64 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::builder()
//!         .consumer_fn("log", |ev: &OrderPlaced| {
//!             println!("order {} placed", ev.order_id);
//!             Ok::<_, ConsumerError>(())
//!         })
//!         .async_consumer_fn("notify", |ev: Arc<OrderPlaced>| async move {
//!             println!("notifying about order {}", ev.order_id);
//!             Ok(())
//!         })
//!         .build();
//!
//!     let publisher = Publisher::builder(Arc::new(registry)).build()?;
//!
//!     publisher.publish(Arc::new(OrderPlaced { order_id: 42 }))?;
//!     publisher.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod consumers;
mod core;
mod error;
mod events;
mod failures;

// ---- Public re-exports ----

pub use crate::core::{
    Config, DEFAULT_THROTTLE_WINDOW, Publisher, PublisherBuilder, ThrottleGuard,
};
pub use consumers::{
    AsyncConsumer, AsyncConsumerFn, Consumer, ConsumerFn, Registry, RegistryBuilder,
    RegistryScopes, Scope, ScopeFactory,
};
pub use error::{ConsumerError, DispatchError};
pub use events::{Event, EventKey, event_name};
pub use failures::{DispatchFailure, DispatchMode, ErrorLog, FailureSink, TracingLog};
