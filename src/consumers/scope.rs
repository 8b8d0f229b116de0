//! # Resolution scopes.
//!
//! A [`Scope`] is the context consumers are resolved in: the [`Registry`] plus
//! the scoped values (request data, connections, ...) their factories may ask
//! for. Each detached dispatch opens a scope of its own through a
//! [`ScopeFactory`] and drops it when the task ends; nothing resolved in the
//! publisher's scope crosses into the task.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{Registry, RegistryScopes, ScopeFactory};
//!
//! struct TenantId(u32);
//!
//! let registry = Arc::new(Registry::builder().build());
//! let scopes = RegistryScopes::new(registry)
//!     .with_initializer(|scope| { scope.insert(TenantId(7)); });
//!
//! let scope = scopes.begin_scope().unwrap();
//! assert_eq!(scope.get::<TenantId>().unwrap().0, 7);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::consumers::{AsyncConsumer, Consumer, Registry};
use crate::error::DispatchError;
use crate::events::Event;

/// Global counter for scope ids.
static SCOPE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opens fresh resolution scopes.
///
/// Called once per `publish` for the publisher side and once inside every
/// detached dispatch.
pub trait ScopeFactory: Send + Sync + 'static {
    /// Opens a new scope.
    fn begin_scope(&self) -> Result<Scope, DispatchError>;
}

impl<F> ScopeFactory for F
where
    F: Fn() -> Result<Scope, DispatchError> + Send + Sync + 'static,
{
    fn begin_scope(&self) -> Result<Scope, DispatchError> {
        self()
    }
}

/// Per-context resolution scope.
pub struct Scope {
    id: u64,
    registry: Arc<Registry>,
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Scope {
    /// Creates an empty scope over `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            id: SCOPE_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            registry,
            values: HashMap::new(),
        }
    }

    /// Unique id of this scope (per process).
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Registry this scope resolves against.
    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Seeds a scoped value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.insert_arc(Arc::new(value))
    }

    /// Seeds an already shared value.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.values.insert(TypeId::of::<T>(), value);
        self
    }

    /// Looks up a scoped value.
    ///
    /// # Errors
    /// [`DispatchError::MissingDependency`] if no value of type `T` was seeded.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, DispatchError> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| Arc::clone(v).downcast::<T>().ok())
            .ok_or(DispatchError::MissingDependency {
                dependency: std::any::type_name::<T>(),
                consumer: "scope",
            })
    }

    /// Resolves the synchronous consumers for `E`, in registration order.
    pub fn sync_consumers<E: Event>(&self) -> Result<Vec<Arc<dyn Consumer<E>>>, DispatchError> {
        let Some(bindings) = self.registry.bindings::<E>() else {
            return Ok(Vec::new());
        };
        bindings
            .sync
            .iter()
            .map(|b| {
                (b.factory)(self).inspect_err(|err| {
                    tracing::debug!(
                        scope = self.id,
                        consumer = b.name,
                        error = %err,
                        "consumer resolution failed"
                    );
                })
            })
            .collect()
    }

    /// Resolves the asynchronous consumers for `E`, in registration order.
    pub fn async_consumers<E: Event>(
        &self,
    ) -> Result<Vec<Arc<dyn AsyncConsumer<E>>>, DispatchError> {
        let Some(bindings) = self.registry.bindings::<E>() else {
            return Ok(Vec::new());
        };
        bindings
            .asynchronous
            .iter()
            .map(|b| {
                (b.factory)(self).inspect_err(|err| {
                    tracing::debug!(
                        scope = self.id,
                        consumer = b.name,
                        error = %err,
                        "consumer resolution failed"
                    );
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("values", &self.values.len())
            .finish()
    }
}

type ScopeInit = Arc<dyn Fn(&mut Scope) + Send + Sync>;

/// Default [`ScopeFactory`]: a scope over the registry, seeded by initializers.
#[derive(Clone)]
pub struct RegistryScopes {
    registry: Arc<Registry>,
    initializers: Vec<ScopeInit>,
}

impl RegistryScopes {
    /// Creates a factory producing empty scopes over `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            initializers: Vec::new(),
        }
    }

    /// Adds an initializer run on every new scope, in insertion order.
    pub fn with_initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&mut Scope) + Send + Sync + 'static,
    {
        self.initializers.push(Arc::new(init));
        self
    }
}

impl ScopeFactory for RegistryScopes {
    fn begin_scope(&self) -> Result<Scope, DispatchError> {
        let mut scope = Scope::new(Arc::clone(&self.registry));
        for init in &self.initializers {
            init(&mut scope);
        }
        Ok(scope)
    }
}
