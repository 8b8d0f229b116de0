//! # Consumers and their resolution.
//!
//! This module provides the handler traits, closure adaptors, the explicit
//! type → consumer [`Registry`], and the per-context [`Scope`] consumers are
//! resolved in.
//!
//! ## Architecture
//! ```text
//! startup:
//!   RegistryBuilder ── consumer::<E>() / async_consumer::<E>() ──► Registry (immutable, Arc)
//!
//! per publish:
//!   ScopeFactory::begin_scope() ──► Scope { registry, scoped values }
//!                                        │
//!                                        ├─► sync_consumers::<E>()  ─► Vec<Arc<dyn Consumer<E>>>
//!                                        └─► async_consumers::<E>() ─► Vec<Arc<dyn AsyncConsumer<E>>>
//! ```
//!
//! ## Consumer kinds
//! - [`Consumer`] runs on the publisher's thread before `publish` returns.
//! - [`AsyncConsumer`] runs in a detached task, inside a scope of its own.

mod consumer;
mod consumer_fn;
mod registry;
mod scope;

pub use consumer::{AsyncConsumer, Consumer};
pub use consumer_fn::{AsyncConsumerFn, ConsumerFn};
pub use registry::{Registry, RegistryBuilder};
pub use scope::{RegistryScopes, Scope, ScopeFactory};
