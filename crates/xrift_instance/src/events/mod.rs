//! # World Event Bus
//!
//! Named events carrying JSON payloads, fanned out to every subscriber of
//! that name. The platform owns `user-joined` and `user-left`; world code
//! may listen to them but never emit them.
//!
//! ## Delivery
//!
//! ```text
//! platform ── deliver("user-joined") ─┐
//!                                     ├──▶ every Subscription listening on the name
//! world code ── emit("door-opened") ──┘    (crossbeam channel per subscription)
//! ```
//!
//! Events sent to one subscription arrive in send order. Dropping a
//! [`Subscription`] unsubscribes it.

mod presence;

pub use presence::PresenceFeed;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::trace;
use xrift_shared::is_platform_event;

use crate::error::{InstanceError, InstanceResult};

// ============================================================================
// EVENTS
// ============================================================================

/// One named event with its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldEvent {
    /// Event name.
    pub name: String,
    /// Event payload.
    pub payload: Value,
}

/// Pub/sub access to the instance's world events.
pub trait WorldEvents: Send + Sync {
    /// Subscribes one channel to every name in `names`. Events for
    /// different names keep their relative send order.
    fn subscribe_all(&self, names: &[&str]) -> Subscription;

    /// Subscribes to a single event name.
    fn subscribe(&self, name: &str) -> Subscription {
        self.subscribe_all(&[name])
    }

    /// Sends an event from world code.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::ReservedEvent`] for platform-owned names.
    fn emit(&self, name: &str, payload: Value) -> InstanceResult<()>;
}

// ============================================================================
// SUBSCRIPTIONS
// ============================================================================

/// Receiving end of a subscription. Unsubscribes on drop.
pub struct Subscription {
    receiver: Receiver<WorldEvent>,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps a receiver with the action that detaches it.
    pub fn new(receiver: Receiver<WorldEvent>, unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Returns the next queued event without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::ChannelClosed`] once the bus is gone and the
    /// queue is drained.
    pub fn try_next(&self) -> InstanceResult<Option<WorldEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(InstanceError::ChannelClosed),
        }
    }

    /// Drains every queued event.
    pub fn drain(&self) -> Vec<WorldEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.receiver.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// IN-MEMORY BUS
// ============================================================================

type ListenerId = u64;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Sender<WorldEvent>)>>>,
}

impl BusInner {
    fn remove(&self, id: ListenerId) {
        let mut listeners = self.listeners.lock();
        for senders in listeners.values_mut() {
            senders.retain(|(listener, _)| *listener != id);
        }
        listeners.retain(|_, senders| !senders.is_empty());
    }

    fn send(&self, name: &str, payload: &Value) -> usize {
        let listeners = self.listeners.lock();
        let Some(senders) = listeners.get(name) else {
            return 0;
        };
        senders
            .iter()
            .filter(|(_, sender)| {
                sender
                    .send(WorldEvent {
                        name: name.to_owned(),
                        payload: payload.clone(),
                    })
                    .is_ok()
            })
            .count()
    }
}

/// Event bus used when no platform bus is injected.
///
/// Cloning shares the same listeners.
#[derive(Clone, Default)]
pub struct LocalEventBus {
    inner: Arc<BusInner>,
}

impl LocalEventBus {
    /// Creates a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an event as the platform. Reserved names are allowed here.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn deliver(&self, name: &str, payload: &Value) -> usize {
        let delivered = self.inner.send(name, payload);
        trace!(event = name, delivered, "Event delivered");
        delivered
    }

    /// Number of live subscriptions on `name`.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner.listeners.lock().get(name).map_or(0, Vec::len)
    }
}

impl WorldEvents for LocalEventBus {
    fn subscribe_all(&self, names: &[&str]) -> Subscription {
        let (sender, receiver) = unbounded();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut listeners = self.inner.listeners.lock();
            for name in names {
                listeners
                    .entry((*name).to_owned())
                    .or_default()
                    .push((id, sender.clone()));
            }
        }
        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        Subscription::new(receiver, move || {
            if let Some(inner) = bus.upgrade() {
                inner.remove(id);
            }
        })
    }

    fn emit(&self, name: &str, payload: Value) -> InstanceResult<()> {
        if is_platform_event(name) {
            return Err(InstanceError::ReservedEvent(name.to_owned()));
        }
        self.deliver(name, &payload);
        Ok(())
    }
}

impl fmt::Debug for LocalEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.inner.listeners.lock().keys().cloned().collect();
        f.debug_struct("LocalEventBus").field("events", &names).finish()
    }
}
