//! # Publisher: throttled, failure-isolated event dispatch.
//!
//! The [`Publisher`] owns the throttle guard, the failure sink and the scope
//! factory, and fans one event out to the consumers registered for its type.
//!
//! ## Flow
//! ```text
//! publish(Arc<E>)
//!   │
//!   ├─► ThrottleGuard::should_suppress ── true ──► Ok(())   (silent drop)
//!   │
//!   ├─► ScopeFactory::begin_scope()  ── Err ──► Err(DispatchError)   (wiring defect)
//!   │
//!   ├─► registry.has_async_consumer(E)?
//!   │        └─ yes ─► TaskTracker::spawn_on(runtime) ────────────────┐  (not awaited)
//!   │                                                                 ▼
//!   │                                       begin_scope() (own scope) ─► async_consumers::<E>()
//!   │                                            for c: c.handle_event(ev).catch_unwind().await
//!   │                                                 └─ Err / panic ─► FailureSink
//!   │
//!   └─► scope.sync_consumers::<E>() ── Err ──► Err(DispatchError)
//!            for c (registration order, caller's thread):
//!                catch_unwind(c.handle_event(&ev))
//!                   └─ Err / panic ─► FailureSink, continue with next
//! ```
//!
//! ## Rules
//! - `publish` never fails because of a consumer; only scope/resolution
//!   failures in the caller's scope propagate.
//! - Sync consumers finish before `publish` returns, in registration order.
//! - The detached task resolves consumers in a scope it opens and drops itself.
//! - No ordering between the detached task and the sync loop, nor between
//!   detached tasks of different `publish` calls.
//! - No cancellation of detached dispatches.

use std::any::TypeId;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use crate::consumers::{Consumer, Registry, Scope, ScopeFactory};
use crate::core::{Config, PublisherBuilder, ThrottleGuard};
use crate::error::{ConsumerError, DispatchError};
use crate::events::{Event, event_name};
use crate::failures::{DispatchFailure, DispatchMode, FailureSink};

/// Consumer name used in failure records when the detached task cannot resolve consumers.
const RESOLVE: &str = "resolve";

/// Broadcasts events to registered consumers.
///
/// Cheap to share behind an `Arc`; `publish` may be called concurrently from
/// any number of threads.
pub struct Publisher {
    cfg: Config,
    scopes: Arc<dyn ScopeFactory>,
    throttle: ThrottleGuard,
    sink: Arc<FailureSink>,
    runtime: Handle,
    tracker: TaskTracker,
}

impl Publisher {
    /// Starts a builder resolving consumers from `registry`.
    #[must_use]
    pub fn builder(registry: Arc<Registry>) -> PublisherBuilder {
        PublisherBuilder::new(registry)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        scopes: Arc<dyn ScopeFactory>,
        sink: Arc<FailureSink>,
        runtime: Handle,
    ) -> Self {
        let throttle = ThrottleGuard::new(cfg.throttle_window(), runtime.clone());
        Self {
            cfg,
            scopes,
            throttle,
            sink,
            runtime,
            tracker: TaskTracker::new(),
        }
    }

    /// Publishes `event` to every consumer registered for `E`.
    ///
    /// Opens a fresh scope for the synchronous consumers. Returns once all
    /// synchronous consumers have run; asynchronous ones run detached.
    ///
    /// # Errors
    /// Only wiring defects: the scope cannot be opened or a synchronous
    /// consumer cannot be resolved. Consumer failures are never returned.
    pub fn publish<E: Event>(&self, event: Arc<E>) -> Result<(), DispatchError> {
        if self.suppressed(&event) {
            return Ok(());
        }
        let scope = self.scopes.begin_scope()?;
        self.dispatch(&scope, event)
    }

    /// Like [`publish`](Self::publish), resolving synchronous consumers in the
    /// caller's `scope` (a request scope, say).
    ///
    /// The detached part still opens a scope of its own.
    pub fn publish_in<E: Event>(&self, scope: &Scope, event: Arc<E>) -> Result<(), DispatchError> {
        if self.suppressed(&event) {
            return Ok(());
        }
        self.dispatch(scope, event)
    }

    /// Closes the tracker and waits up to [`Config::grace`] for detached
    /// dispatches to finish.
    ///
    /// Publishing after shutdown still works; those dispatches are simply not
    /// waited for by this call.
    pub async fn shutdown(&self) -> Result<(), DispatchError> {
        self.tracker.close();
        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(DispatchError::GraceExceeded {
                grace,
                in_flight: self.tracker.len(),
            }),
        }
    }

    /// Detached dispatches currently running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Failure sink (recorded/dropped counters).
    pub fn failures(&self) -> &FailureSink {
        &self.sink
    }

    /// Instances currently inside their throttle window.
    pub fn throttled(&self) -> usize {
        self.throttle.len()
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    fn suppressed<E: Event>(&self, event: &Arc<E>) -> bool {
        let suppressed = self.throttle.should_suppress(event);
        if suppressed {
            tracing::debug!(event = event_name::<E>(), "duplicate publish suppressed");
        }
        suppressed
    }

    fn dispatch<E: Event>(&self, scope: &Scope, event: Arc<E>) -> Result<(), DispatchError> {
        if scope.registry().has_async_consumer(TypeId::of::<E>()) {
            self.spawn_detached(Arc::clone(&event));
        }

        let consumers = scope.sync_consumers::<E>()?;
        tracing::debug!(
            event = event_name::<E>(),
            scope = scope.id(),
            consumers = consumers.len(),
            "dispatching"
        );
        for consumer in consumers {
            self.invoke(consumer.as_ref(), &event);
        }
        Ok(())
    }

    /// Runs one synchronous consumer, routing any failure to the sink.
    fn invoke<E: Event>(&self, consumer: &dyn Consumer<E>, event: &E) {
        let error = match catch_unwind(AssertUnwindSafe(|| consumer.handle_event(event))) {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(panic) => ConsumerError::from_panic(panic),
        };
        self.sink.record(DispatchFailure::new(
            event_name::<E>(),
            consumer.name(),
            DispatchMode::Sync,
            error,
        ));
    }

    fn spawn_detached<E: Event>(&self, event: Arc<E>) {
        let scopes = Arc::clone(&self.scopes);
        let sink = Arc::clone(&self.sink);
        self.tracker.spawn_on(run_detached(scopes, sink, event), &self.runtime);
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("cfg", &self.cfg)
            .field("throttle", &self.throttle)
            .field("sink", &self.sink)
            .field("in_flight", &self.tracker.len())
            .finish()
    }
}

/// Body of one detached dispatch. Owns its scope from start to end.
async fn run_detached<E: Event>(
    scopes: Arc<dyn ScopeFactory>,
    sink: Arc<FailureSink>,
    event: Arc<E>,
) {
    let record = |consumer: &'static str, error: ConsumerError| {
        sink.record(DispatchFailure::new(
            event_name::<E>(),
            consumer,
            DispatchMode::Async,
            error,
        ));
    };

    let resolved = catch_unwind(AssertUnwindSafe(|| {
        let scope = scopes.begin_scope()?;
        let consumers = scope.async_consumers::<E>()?;
        Ok::<_, DispatchError>((scope, consumers))
    }));
    let (scope, consumers) = match resolved {
        Ok(Ok(resolved)) => resolved,
        Ok(Err(err)) => return record(RESOLVE, err.into()),
        Err(panic) => return record(RESOLVE, ConsumerError::from_panic(panic)),
    };

    for consumer in consumers {
        let fut = consumer.handle_event(Arc::clone(&event));
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => record(consumer.name(), err),
            Err(panic) => record(consumer.name(), ConsumerError::from_panic(panic)),
        }
    }

    tracing::trace!(
        event = event_name::<E>(),
        scope = scope.id(),
        "detached dispatch finished"
    );
    drop(scope);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::{Notify, mpsc};

    use super::*;
    use crate::consumers::{AsyncConsumer, RegistryScopes};
    use crate::failures::ErrorLog;

    #[derive(Debug, PartialEq)]
    struct OrderPlaced {
        order_id: u64,
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<DispatchFailure>>);

    impl Recorder {
        fn consumers(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().iter().map(|f| f.consumer).collect()
        }
    }

    impl ErrorLog for Recorder {
        fn error(&self, _: &str, failure: &DispatchFailure) {
            self.0.lock().unwrap().push(failure.clone());
        }
    }

    fn build(registry: Registry, cfg: Config) -> (Publisher, Arc<Recorder>) {
        let log = Arc::new(Recorder::default());
        let publisher = Publisher::builder(Arc::new(registry))
            .with_config(cfg)
            .with_error_log(log.clone())
            .build()
            .unwrap();
        (publisher, log)
    }

    fn counting(hits: Arc<AtomicUsize>) -> impl Fn(&OrderPlaced) -> Result<(), ConsumerError> {
        move |_: &OrderPlaced| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_instances_both_dispatch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .consumer_fn("count", counting(Arc::clone(&hits)))
            .build();
        let (publisher, _) = build(registry, Config::default());

        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();
        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_instance_dispatches_once_per_window() {
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .consumer_fn("count", counting(Arc::clone(&hits)))
            .build();
        let (publisher, _) = build(registry, Config::default());
        let ev = Arc::new(OrderPlaced { order_id: 7 });

        publisher.publish(Arc::clone(&ev)).unwrap();
        publisher.publish(Arc::clone(&ev)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        publisher.publish(Arc::clone(&ev)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.throttled(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(publisher.throttled(), 0);
        publisher.publish(Arc::clone(&ev)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_window_disables_throttle() {
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .consumer_fn("count", counting(Arc::clone(&hits)))
            .build();
        let cfg = Config {
            throttle_window: Duration::ZERO,
            ..Config::default()
        };
        let (publisher, _) = build(registry, cfg);
        let ev = Arc::new(OrderPlaced { order_id: 7 });

        publisher.publish(Arc::clone(&ev)).unwrap();
        publisher.publish(ev).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failing_sync_consumer_does_not_stop_siblings() {
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .consumer_fn("c1", |_: &OrderPlaced| Err(ConsumerError::fail("c1 broke")))
            .consumer_fn("c2", counting(Arc::clone(&hits)))
            .build();
        let (publisher, log) = build(registry, Config::default());

        let result = publisher.publish(Arc::new(OrderPlaced { order_id: 1 }));

        assert!(result.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(log.consumers(), vec!["c1"]);
        assert_eq!(publisher.failures().recorded(), 1);
    }

    #[tokio::test]
    async fn test_panicking_sync_consumer_is_isolated() {
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .consumer_fn("boom", |_: &OrderPlaced| -> Result<(), ConsumerError> {
                panic!("consumer exploded")
            })
            .consumer_fn("after", counting(Arc::clone(&hits)))
            .build();
        let (publisher, log) = build(registry, Config::default());

        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let failures = log.0.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].mode, DispatchMode::Sync);
        assert_eq!(
            failures[0].error,
            ConsumerError::Panicked {
                info: "consumer exploded".into()
            }
        );
    }

    #[tokio::test]
    async fn test_sync_consumers_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = Registry::builder();
        for name in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            builder = builder.consumer_fn(name, move |_: &OrderPlaced| {
                seen.lock().unwrap().push(name);
                Ok::<_, ConsumerError>(())
            });
        }
        let (publisher, _) = build(builder.build(), Config::default());

        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_no_consumers_is_a_quiet_no_op() {
        let (publisher, _) = build(Registry::builder().build(), Config::default());

        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();

        assert_eq!(publisher.in_flight(), 0);
        assert_eq!(publisher.failures().recorded(), 0);
        assert_eq!(publisher.failures().dropped(), 0);
    }

    struct Slow {
        gate: Arc<Notify>,
        done: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AsyncConsumer<OrderPlaced> for Slow {
        async fn handle_event(&self, _: Arc<OrderPlaced>) -> Result<(), ConsumerError> {
            self.gate.notified().await;
            self.done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_consumers_do_not_block_publish() {
        let gate = Arc::new(Notify::new());
        let done = Arc::new(AtomicUsize::new(0));
        let registry = Registry::builder()
            .async_consumer::<OrderPlaced, _>(Arc::new(Slow {
                gate: Arc::clone(&gate),
                done: Arc::clone(&done),
            }))
            .build();
        let (publisher, _) = build(registry, Config::default());

        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.in_flight(), 1);

        gate.notify_one();
        publisher.shutdown().await.unwrap();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    struct LogConsumer(Arc<Mutex<Vec<u64>>>);

    impl Consumer<OrderPlaced> for LogConsumer {
        fn handle_event(&self, ev: &OrderPlaced) -> Result<(), ConsumerError> {
            self.0.lock().unwrap().push(ev.order_id);
            Ok(())
        }
    }

    struct NotifyConsumer(mpsc::UnboundedSender<Arc<OrderPlaced>>);

    #[async_trait]
    impl AsyncConsumer<OrderPlaced> for NotifyConsumer {
        async fn handle_event(&self, ev: Arc<OrderPlaced>) -> Result<(), ConsumerError> {
            self.0.send(ev).map_err(|_| ConsumerError::fail("receiver gone"))
        }
    }

    #[tokio::test]
    async fn test_order_placed_reaches_sync_and_async_consumers() {
        let logged = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = Registry::builder()
            .consumer::<OrderPlaced, _>(Arc::new(LogConsumer(Arc::clone(&logged))))
            .async_consumer::<OrderPlaced, _>(Arc::new(NotifyConsumer(tx)))
            .build();
        let (publisher, log) = build(registry, Config::default());
        let ev = Arc::new(OrderPlaced { order_id: 42 });

        publisher.publish(Arc::clone(&ev)).unwrap();
        assert_eq!(*logged.lock().unwrap(), vec![42]);

        let notified = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&notified, &ev));
        assert!(log.consumers().is_empty());
    }

    struct Panics;

    #[async_trait]
    impl AsyncConsumer<OrderPlaced> for Panics {
        async fn handle_event(&self, _: Arc<OrderPlaced>) -> Result<(), ConsumerError> {
            panic!("queue unreachable")
        }

        fn name(&self) -> &'static str {
            "panics"
        }
    }

    #[tokio::test]
    async fn test_async_failures_go_to_sink_and_siblings_still_run() {
        let hits = Arc::new(AtomicUsize::new(0));
        let after = Arc::clone(&hits);
        let registry = Registry::builder()
            .async_consumer_fn("fails", |_: Arc<OrderPlaced>| async {
                Err::<(), _>(ConsumerError::fail("smtp down"))
            })
            .async_consumer::<OrderPlaced, _>(Arc::new(Panics))
            .async_consumer_fn("after", move |_: Arc<OrderPlaced>| {
                let hits = Arc::clone(&after);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build();
        let (publisher, log) = build(registry, Config::default());

        publisher.publish(Arc::new(OrderPlaced { order_id: 9 })).unwrap();
        publisher.shutdown().await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(log.consumers(), vec!["fails", "panics"]);
        assert!(
            log.0
                .lock()
                .unwrap()
                .iter()
                .all(|f| f.mode == DispatchMode::Async)
        );
    }

    struct ScopeId(u64);

    struct ScopeProbe {
        scope: u64,
        seen: Arc<Mutex<Vec<u64>>>,
    }

    impl Consumer<OrderPlaced> for ScopeProbe {
        fn handle_event(&self, _: &OrderPlaced) -> Result<(), ConsumerError> {
            self.seen.lock().unwrap().push(self.scope);
            Ok(())
        }
    }

    #[async_trait]
    impl AsyncConsumer<OrderPlaced> for ScopeProbe {
        async fn handle_event(&self, _: Arc<OrderPlaced>) -> Result<(), ConsumerError> {
            self.seen.lock().unwrap().push(self.scope);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_detached_dispatch_resolves_in_its_own_scope() {
        let sync_seen = Arc::new(Mutex::new(Vec::new()));
        let async_seen = Arc::new(Mutex::new(Vec::new()));
        let (s, a) = (Arc::clone(&sync_seen), Arc::clone(&async_seen));

        let registry = Arc::new(
            Registry::builder()
                .consumer_with::<OrderPlaced, _, _>(move |scope| {
                    Ok(Arc::new(ScopeProbe {
                        scope: scope.get::<ScopeId>()?.0,
                        seen: Arc::clone(&s),
                    }))
                })
                .async_consumer_with::<OrderPlaced, _, _>(move |scope| {
                    Ok(Arc::new(ScopeProbe {
                        scope: scope.get::<ScopeId>()?.0,
                        seen: Arc::clone(&a),
                    }))
                })
                .build(),
        );
        let scopes = RegistryScopes::new(Arc::clone(&registry)).with_initializer(|scope| {
            let id = scope.id();
            scope.insert(ScopeId(id));
        });
        let publisher = Publisher::builder(Arc::clone(&registry))
            .with_scopes(scopes)
            .build()
            .unwrap();

        let mut request = Scope::new(registry);
        request.insert(ScopeId(u64::MAX));
        publisher
            .publish_in(&request, Arc::new(OrderPlaced { order_id: 1 }))
            .unwrap();
        publisher.shutdown().await.unwrap();

        assert_eq!(*sync_seen.lock().unwrap(), vec![u64::MAX]);
        let async_scope = async_seen.lock().unwrap()[0];
        assert_ne!(async_scope, u64::MAX);
    }

    #[tokio::test]
    async fn test_caller_scope_resolution_failure_propagates() {
        struct Db;
        struct NeedsDb;
        impl Consumer<OrderPlaced> for NeedsDb {
            fn handle_event(&self, _: &OrderPlaced) -> Result<(), ConsumerError> {
                Ok(())
            }
        }

        let registry = Registry::builder()
            .consumer_with::<OrderPlaced, _, _>(|scope| {
                scope.get::<Db>()?;
                Ok(Arc::new(NeedsDb))
            })
            .build();
        let (publisher, log) = build(registry, Config::default());

        let err = publisher
            .publish(Arc::new(OrderPlaced { order_id: 1 }))
            .unwrap_err();
        assert_eq!(err.as_label(), "dispatch_missing_dependency");
        assert!(log.consumers().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_scope_propagates() {
        let publisher = Publisher::builder(Arc::new(Registry::builder().build()))
            .with_scopes(|| -> Result<Scope, DispatchError> {
                Err(DispatchError::ScopeUnavailable {
                    reason: "container disposed".into(),
                })
            })
            .build()
            .unwrap();

        let err = publisher
            .publish(Arc::new(OrderPlaced { order_id: 1 }))
            .unwrap_err();
        assert!(matches!(err, DispatchError::ScopeUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_detached_resolution_failure_is_recorded_not_returned() {
        struct Mailer;
        struct NeedsMailer;
        #[async_trait]
        impl AsyncConsumer<OrderPlaced> for NeedsMailer {
            async fn handle_event(&self, _: Arc<OrderPlaced>) -> Result<(), ConsumerError> {
                Ok(())
            }
        }

        let registry = Registry::builder()
            .async_consumer_with::<OrderPlaced, _, _>(|scope| {
                scope.get::<Mailer>()?;
                Ok(Arc::new(NeedsMailer))
            })
            .build();
        let (publisher, log) = build(registry, Config::default());

        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();
        publisher.shutdown().await.unwrap();

        let failures = log.0.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].consumer, "resolve");
        assert_eq!(failures[0].error.as_label(), "consumer_resolution_failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_stuck_dispatches() {
        let registry = Registry::builder()
            .async_consumer_fn("stuck", |_: Arc<OrderPlaced>| async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .build();
        let cfg = Config {
            grace: Duration::from_millis(50),
            ..Config::default()
        };
        let (publisher, _) = build(registry, cfg);

        publisher.publish(Arc::new(OrderPlaced { order_id: 1 })).unwrap();
        let err = publisher.shutdown().await.unwrap_err();

        assert_eq!(
            err,
            DispatchError::GraceExceeded {
                grace: Duration::from_millis(50),
                in_flight: 1
            }
        );
    }
}
