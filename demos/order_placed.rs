//! # Example: order_placed
//!
//! Publishes an `OrderPlaced` event to one synchronous and one asynchronous consumer.
//!
//! Shows how to:
//! - Implement [`Consumer`] and [`AsyncConsumer`].
//! - Seed scoped dependencies with [`RegistryScopes::with_initializer`].
//! - Observe throttling of a republished instance and failure isolation.
//!
//! ## Flow
//! ```text
//! publish(OrderPlaced #42)
//!     ├─► LogConsumer.handle_event()      (caller's thread, before publish returns)
//!     ├─► FlakyConsumer.handle_event()    (fails → FailureSink → tracing::error!)
//!     └─► NotifyConsumer.handle_event()   (detached task, own scope with Mailer)
//!
//! publish(same instance again) ──► suppressed (within 150ms)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example order_placed
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventvisor::{
    AsyncConsumer, Consumer, ConsumerError, Publisher, Registry, RegistryScopes,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct OrderPlaced {
    order_id: u64,
}

struct LogConsumer;

impl Consumer<OrderPlaced> for LogConsumer {
    fn handle_event(&self, ev: &OrderPlaced) -> Result<(), ConsumerError> {
        println!("[log] order {} placed", ev.order_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

struct FlakyConsumer;

impl Consumer<OrderPlaced> for FlakyConsumer {
    fn handle_event(&self, _: &OrderPlaced) -> Result<(), ConsumerError> {
        Err(ConsumerError::fail("search index offline"))
    }

    fn name(&self) -> &'static str {
        "search-index"
    }
}

/// Scoped dependency: one per resolution scope.
struct Mailer {
    scope: u64,
}

struct NotifyConsumer {
    mailer: Arc<Mailer>,
}

#[async_trait]
impl AsyncConsumer<OrderPlaced> for NotifyConsumer {
    async fn handle_event(&self, ev: Arc<OrderPlaced>) -> Result<(), ConsumerError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        println!(
            "[notify] mail sent for order {} (mailer from scope {})",
            ev.order_id, self.mailer.scope
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "notify"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(
        Registry::builder()
            .consumer::<OrderPlaced, _>(Arc::new(LogConsumer))
            .consumer::<OrderPlaced, _>(Arc::new(FlakyConsumer))
            .async_consumer_with::<OrderPlaced, _, _>(|scope| {
                Ok(Arc::new(NotifyConsumer {
                    mailer: scope.get::<Mailer>()?,
                }))
            })
            .build(),
    );

    let scopes = RegistryScopes::new(Arc::clone(&registry)).with_initializer(|scope| {
        let id = scope.id();
        scope.insert(Mailer { scope: id });
    });

    let publisher = Publisher::builder(registry).with_scopes(scopes).build()?;

    let order = Arc::new(OrderPlaced { order_id: 42 });
    publisher.publish(Arc::clone(&order))?;
    println!("[main] publish returned");

    publisher.publish(Arc::clone(&order))?;
    println!("[main] republish within window suppressed");

    publisher.shutdown().await?;
    println!(
        "[main] done: failures recorded={} dropped={}",
        publisher.failures().recorded(),
        publisher.failures().dropped()
    );
    Ok(())
}
