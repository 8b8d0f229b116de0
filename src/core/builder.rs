use std::sync::Arc;

use tokio::runtime::Handle;

use crate::{
    consumers::{Registry, RegistryScopes, ScopeFactory},
    core::{Config, Publisher},
    error::DispatchError,
    failures::{ErrorLog, FailureSink, TracingLog},
};

/// Builder for constructing a [`Publisher`] with its collaborators.
///
/// Every collaborator is injected here; the publisher never looks anything up
/// globally.
pub struct PublisherBuilder {
    cfg: Config,
    scopes: Arc<dyn ScopeFactory>,
    log: Option<Arc<dyn ErrorLog>>,
    runtime: Option<Handle>,
}

impl PublisherBuilder {
    /// Creates a builder whose scopes resolve against `registry`.
    ///
    /// Defaults: [`Config::default`], [`TracingLog`] as the error log, and the
    /// tokio runtime current at [`build`](Self::build) time.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            cfg: Config::default(),
            scopes: Arc::new(RegistryScopes::new(registry)),
            log: Some(Arc::new(TracingLog::new())),
            runtime: None,
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replaces the scope factory (e.g. a [`RegistryScopes`] with initializers,
    /// or a closure bridging to an application container).
    pub fn with_scopes<S: ScopeFactory>(mut self, scopes: S) -> Self {
        self.scopes = Arc::new(scopes);
        self
    }

    /// Sets the logging capability used by the failure sink.
    pub fn with_error_log(mut self, log: Arc<dyn ErrorLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Removes the logging capability; failures are then counted as dropped.
    pub fn without_error_log(mut self) -> Self {
        self.log = None;
        self
    }

    /// Runs detached dispatches and throttle timers on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the publisher.
    ///
    /// # Errors
    /// [`DispatchError::NoRuntime`] if no runtime was given and none is current.
    pub fn build(self) -> Result<Publisher, DispatchError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| DispatchError::NoRuntime)?,
        };
        let sink = Arc::new(FailureSink::new(self.log));
        Ok(Publisher::new_internal(self.cfg, self.scopes, sink, runtime))
    }
}
