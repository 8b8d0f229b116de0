//! # Throttle guard - per-instance debounce of republication.
//!
//! Naive call sites republish the same event object on every tick of a loop;
//! [`ThrottleGuard`] drops such repeats for a short window.
//!
//! ## Architecture
//! ```text
//! should_suppress(&Arc<E>)
//!     │
//!     ├─ lock entries
//!     │    ├─ live entry for this instance ─────────► true  (drop publish)
//!     │    └─ absent / past deadline ─► insert Entry { pinned Arc, deadline, gen }
//!     ├─ unlock
//!     └─ arm timer: sleep(window) ─► remove entry if gen still matches ─► false
//! ```
//!
//! ## Rules
//! - Keyed on instance identity ([`EventKey`]), never on content equality.
//!   Two equal-looking events are two events.
//! - Check-and-insert is one critical section: concurrent publishers of the same
//!   instance cannot both pass, and only one timer is armed per live entry.
//! - The entry pins the `Arc`, so the address cannot be reused by another event
//!   while the entry is live.
//! - A timer only removes the entry it armed (generation check), so an entry is
//!   removed exactly once.
//! - Best-effort debounce, not exactly-once delivery.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::events::{Event, EventKey};

type Entries = Mutex<HashMap<EventKey, Entry>>;

/// Pending expiry for one published instance.
struct Entry {
    _pinned: Arc<dyn Any + Send + Sync>,
    deadline: Instant,
    generation: u64,
}

/// Instance-identity throttle.
pub struct ThrottleGuard {
    window: Option<Duration>,
    entries: Arc<Entries>,
    generation: AtomicU64,
    runtime: Handle,
}

impl ThrottleGuard {
    /// Creates a guard; `None` disables throttling. Expiry timers run on `runtime`.
    pub fn new(window: Option<Duration>, runtime: Handle) -> Self {
        Self {
            window,
            entries: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            runtime,
        }
    }

    /// Returns `true` if `event` was already published within the window.
    ///
    /// On `false` the instance has been armed: further calls with it return
    /// `true` until the window elapses.
    pub fn should_suppress<E: Event>(&self, event: &Arc<E>) -> bool {
        let Some(window) = self.window else {
            return false;
        };
        let key = EventKey::of(event);
        let now = Instant::now();

        let generation = {
            let mut entries = lock(&self.entries);
            if entries.get(&key).is_some_and(|e| e.deadline > now) {
                return true;
            }
            let generation = self.generation.fetch_add(1, AtomicOrdering::Relaxed);
            entries.insert(
                key,
                Entry {
                    _pinned: Arc::clone(event) as Arc<dyn Any + Send + Sync>,
                    deadline: now + window,
                    generation,
                },
            );
            generation
        };

        self.arm(key, generation, window);
        false
    }

    /// Number of live (not yet expired) entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// True if no instance is currently throttled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn arm(&self, key: EventKey, generation: u64, window: Duration) {
        let entries: Weak<Entries> = Arc::downgrade(&self.entries);
        self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(entries) = entries.upgrade() {
                let mut entries = lock(&entries);
                if entries.get(&key).is_some_and(|e| e.generation == generation) {
                    entries.remove(&key);
                }
            }
        });
    }
}

impl std::fmt::Debug for ThrottleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottleGuard")
            .field("window", &self.window)
            .field("entries", &self.len())
            .finish()
    }
}

// A poisoned map is still structurally valid: entries are inserted and removed whole.
fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<EventKey, Entry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}
