//! # Consumer registry - explicit event type → consumer bindings.
//!
//! Consumers are registered once at startup through [`RegistryBuilder`]; the
//! built [`Registry`] is immutable and shared behind an `Arc`.
//!
//! ## Architecture
//! ```text
//! Registry
//!   └─ HashMap<TypeId, Entry>
//!        └─ Entry { name, sync: Vec<Binding>, async: Vec<Binding> }
//!                                  │
//!                                  └─ Binding = factory(&Scope) -> Arc<dyn Consumer<E>>
//! ```
//!
//! ## Rules
//! - Registration order is dispatch order for sync consumers (and for the
//!   sequential async loop).
//! - A binding is a *factory*: instances are produced per scope, so consumers
//!   may depend on scoped values. Registering a ready instance binds a factory
//!   that hands out clones of the same `Arc`.
//! - Lookups for unregistered types are empty, not errors.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::consumers::{AsyncConsumer, AsyncConsumerFn, Consumer, ConsumerFn, Scope};
use crate::error::{ConsumerError, DispatchError};
use crate::events::{Event, event_name};

type SyncFactory<E> =
    Arc<dyn Fn(&Scope) -> Result<Arc<dyn Consumer<E>>, DispatchError> + Send + Sync>;
type AsyncFactory<E> =
    Arc<dyn Fn(&Scope) -> Result<Arc<dyn AsyncConsumer<E>>, DispatchError> + Send + Sync>;

/// One registered factory and the consumer type name it produces.
pub(crate) struct Binding<F> {
    pub(crate) name: &'static str,
    pub(crate) factory: F,
}

/// Both partitions for one event type.
pub(crate) struct Bindings<E: Event> {
    pub(crate) sync: Vec<Binding<SyncFactory<E>>>,
    pub(crate) asynchronous: Vec<Binding<AsyncFactory<E>>>,
}

impl<E: Event> Default for Bindings<E> {
    fn default() -> Self {
        Self {
            sync: Vec::new(),
            asynchronous: Vec::new(),
        }
    }
}

/// Type-erased bindings for one event type, plus counts readable without `E`.
struct Entry {
    event: &'static str,
    sync_count: usize,
    async_count: usize,
    bindings: Box<dyn Any + Send + Sync>,
}

impl Entry {
    fn new<E: Event>() -> Self {
        Self {
            event: event_name::<E>(),
            sync_count: 0,
            async_count: 0,
            bindings: Box::new(Bindings::<E>::default()),
        }
    }
}

/// Immutable event type → consumers mapping.
pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

impl Registry {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// True if at least one async consumer is registered for `event_type`.
    pub fn has_async_consumer(&self, event_type: TypeId) -> bool {
        self.entries
            .get(&event_type)
            .is_some_and(|e| e.async_count > 0)
    }

    /// True if any consumer (either partition) is registered for `event_type`.
    pub fn has_consumers(&self, event_type: TypeId) -> bool {
        self.entries
            .get(&event_type)
            .is_some_and(|e| e.sync_count + e.async_count > 0)
    }

    /// Number of event types with at least one binding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted names of the registered event types.
    pub fn event_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.values().map(|e| e.event).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn bindings<E: Event>(&self) -> Option<&Bindings<E>> {
        self.entries
            .get(&TypeId::of::<E>())
            .and_then(|e| e.bindings.downcast_ref::<Bindings<E>>())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("events", &self.event_names())
            .finish()
    }
}

/// Startup-time registration of consumers.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::any::TypeId;
/// use eventvisor::{ConsumerError, Registry};
///
/// struct OrderPlaced { order_id: u64 }
///
/// let registry = Registry::builder()
///     .consumer_fn("log", |ev: &OrderPlaced| {
///         let _ = ev.order_id;
///         Ok::<_, ConsumerError>(())
///     })
///     .async_consumer_fn("notify", |_ev: Arc<OrderPlaced>| async { Ok(()) })
///     .build();
///
/// assert!(registry.has_async_consumer(TypeId::of::<OrderPlaced>()));
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<TypeId, Entry>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a ready synchronous consumer instance.
    pub fn consumer<E, C>(self, consumer: Arc<C>) -> Self
    where
        E: Event,
        C: Consumer<E>,
    {
        self.consumer_with::<E, C, _>(move |_| Ok(Arc::clone(&consumer)))
    }

    /// Binds a synchronous consumer produced per scope.
    ///
    /// A [`DispatchError::MissingDependency`] returned by the factory is
    /// attributed to `C`.
    pub fn consumer_with<E, C, F>(mut self, factory: F) -> Self
    where
        E: Event,
        C: Consumer<E>,
        F: Fn(&Scope) -> Result<Arc<C>, DispatchError> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<C>();
        let factory: SyncFactory<E> = Arc::new(move |scope: &Scope| {
            factory(scope)
                .map(|c| c as Arc<dyn Consumer<E>>)
                .map_err(|e| attribute(e, name))
        });
        let entry = self.entry::<E>();
        entry.sync_count += 1;
        bindings_mut::<E>(entry).sync.push(Binding { name, factory });
        self
    }

    /// Binds a closure as a synchronous consumer.
    pub fn consumer_fn<E, F>(self, name: &'static str, f: F) -> Self
    where
        E: Event,
        F: Fn(&E) -> Result<(), ConsumerError> + Send + Sync + 'static,
    {
        self.consumer::<E, _>(ConsumerFn::arc(name, f))
    }

    /// Binds a ready asynchronous consumer instance.
    pub fn async_consumer<E, C>(self, consumer: Arc<C>) -> Self
    where
        E: Event,
        C: AsyncConsumer<E>,
    {
        self.async_consumer_with::<E, C, _>(move |_| Ok(Arc::clone(&consumer)))
    }

    /// Binds an asynchronous consumer produced per scope.
    ///
    /// The factory runs inside the detached task's own scope.
    pub fn async_consumer_with<E, C, F>(mut self, factory: F) -> Self
    where
        E: Event,
        C: AsyncConsumer<E>,
        F: Fn(&Scope) -> Result<Arc<C>, DispatchError> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<C>();
        let factory: AsyncFactory<E> = Arc::new(move |scope: &Scope| {
            factory(scope)
                .map(|c| c as Arc<dyn AsyncConsumer<E>>)
                .map_err(|e| attribute(e, name))
        });
        let entry = self.entry::<E>();
        entry.async_count += 1;
        bindings_mut::<E>(entry)
            .asynchronous
            .push(Binding { name, factory });
        self
    }

    /// Binds a closure as an asynchronous consumer.
    pub fn async_consumer_fn<E, F, Fut>(self, name: &'static str, f: F) -> Self
    where
        E: Event,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), ConsumerError>> + Send + 'static,
    {
        self.async_consumer::<E, _>(AsyncConsumerFn::arc(name, f))
    }

    /// Freezes the bindings.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }

    fn entry<E: Event>(&mut self) -> &mut Entry {
        self.entries
            .entry(TypeId::of::<E>())
            .or_insert_with(Entry::new::<E>)
    }
}

fn bindings_mut<E: Event>(entry: &mut Entry) -> &mut Bindings<E> {
    if !entry.bindings.is::<Bindings<E>>() {
        entry.bindings = Box::new(Bindings::<E>::default());
    }
    entry
        .bindings
        .downcast_mut::<Bindings<E>>()
        .expect("entry is keyed by TypeId::of::<E>()")
}

/// Names the consumer in a missing-dependency error raised by its factory.
fn attribute(err: DispatchError, consumer: &'static str) -> DispatchError {
    match err {
        DispatchError::MissingDependency { dependency, .. } => DispatchError::MissingDependency {
            dependency,
            consumer,
        },
        other => other,
    }
}
