//! Subscriber registry and synchronous dispatch.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::taxonomy::{AppEvent, EventName};

type Callback = Arc<dyn Fn(&AppEvent) + Send + Sync>;

/// Identity of one registration; closures have none of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<EventName, Vec<Registration>>>,
}

impl BusInner {
    fn listeners(&self) -> MutexGuard<'_, HashMap<EventName, Vec<Registration>>> {
        // Callbacks never run under this lock, so poisoning only means a
        // panic inside the map bookkeeping itself; the data is still usable.
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert(&self, event: EventName, id: SubscriptionId, callback: Callback) {
        self.listeners()
            .entry(event)
            .or_default()
            .push(Registration { id, callback });
    }

    fn remove(&self, event: EventName, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners();
        let Some(registrations) = listeners.get_mut(&event) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        let removed = registrations.len() != before;
        if registrations.is_empty() {
            listeners.remove(&event);
        }
        removed
    }
}

/// Process-wide publish/subscribe registry.
///
/// The bus is an explicitly constructed value; clones share one registry, and
/// independent buses never see each other's events.
///
/// Dispatch is synchronous and ordered by registration. [`publish`](Self::publish)
/// copies the current registration list before calling anyone, so callbacks may
/// subscribe, unsubscribe or publish re-entrantly without changing who is called
/// in the current pass.
///
/// A callback that panics is isolated: the panic is caught and logged, and the
/// remaining callbacks still run.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.inner.listeners();
        let total: usize = listeners.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("event_count", &listeners.len())
            .field("subscription_count", &total)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`.
    ///
    /// The returned [`Subscription`] removes exactly this registration.
    pub fn subscribe<F>(&self, event: EventName, callback: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = self.inner.allocate_id();
        self.inner.insert(event, id, Arc::new(callback));
        tracing::trace!(name: "bus.subscribed", event = %event, id = id.0);
        self.handle(event, id)
    }

    /// Register `callback` to run on the next `event` only.
    ///
    /// The returned handle cancels the registration early if the event has not
    /// fired yet. Re-entrant publishes during the first invocation do not call
    /// it a second time.
    pub fn once<F>(&self, event: EventName, callback: F) -> Subscription
    where
        F: FnOnce(&AppEvent) + Send + 'static,
    {
        let id = self.inner.allocate_id();
        let handle = self.handle(event, id);
        let own = handle.clone();
        let slot = Mutex::new(Some(callback));
        self.inner.insert(
            event,
            id,
            Arc::new(move |payload: &AppEvent| {
                let callback = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(callback) = callback {
                    own.unsubscribe();
                    callback(payload);
                }
            }),
        );
        handle
    }

    /// Remove one registration, or every registration for `event` when `id`
    /// is `None`.
    ///
    /// # Hazard
    ///
    /// The bulk form silently cancels subscriptions owned by other panels.
    /// Prefer [`Subscription::unsubscribe`]; the bulk form exists for
    /// handlers that must be the sole listener of an event and re-register
    /// on every start.
    pub fn unsubscribe(&self, event: EventName, id: Option<SubscriptionId>) {
        match id {
            Some(id) => {
                self.inner.remove(event, id);
            }
            None => self.unsubscribe_all(event),
        }
    }

    /// Remove every registration for `event`. See the hazard on
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn unsubscribe_all(&self, event: EventName) {
        let removed = self.inner.listeners().remove(&event).map_or(0, |v| v.len());
        if removed > 0 {
            tracing::warn!(
                name: "bus.bulk_unsubscribe",
                event = %event,
                removed,
                "Removed all subscriptions for event"
            );
        }
    }

    /// Invoke every callback currently registered for the event's name.
    ///
    /// Returns how many callbacks completed without panicking. Publishing
    /// with no subscribers is a no-op.
    pub fn publish(&self, event: &AppEvent) -> usize {
        let name = event.name();
        let snapshot: Vec<Callback> = self
            .inner
            .listeners()
            .get(&name)
            .map(|regs| regs.iter().map(|r| Arc::clone(&r.callback)).collect())
            .unwrap_or_default();

        tracing::debug!(
            name: "bus.publish",
            event = %name,
            subscribers = snapshot.len()
        );

        let mut delivered = 0;
        for callback in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(ToString::to_string)
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    tracing::error!(
                        name: "bus.subscriber_panicked",
                        event = %name,
                        reason = %reason,
                        "Event subscriber panicked; continuing dispatch"
                    );
                }
            }
        }
        delivered
    }

    /// Number of live registrations for `event`.
    pub fn subscriber_count(&self, event: EventName) -> usize {
        self.inner.listeners().get(&event).map_or(0, Vec::len)
    }

    fn handle(&self, event: EventName, id: SubscriptionId) -> Subscription {
        Subscription {
            bus: Arc::downgrade(&self.inner),
            event,
            id,
        }
    }
}

/// Capability to cancel one registration.
///
/// Dropping the handle does not unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe) when the owning view goes away.
/// The handle holds only a weak reference to the bus.
#[derive(Clone)]
pub struct Subscription {
    bus: Weak<BusInner>,
    event: EventName,
    id: SubscriptionId,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

impl Subscription {
    pub fn event(&self) -> EventName {
        self.event
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove this registration. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.event, self.id);
        }
    }
}
