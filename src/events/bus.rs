//! The non-blocking publish/subscribe bus.
//!
//! Each subscription owns a bounded lock-free queue. Publishing tries every
//! matching queue and never blocks: when a subscriber has fallen behind, the
//! event is dropped for that subscriber and its drop counter incremented.
//! There is no shared mutable state between subscribers.

use super::event::{EngineEvent, EventKind};
use crossbeam::queue::ArrayQueue;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

struct SubscriptionEntry {
    id: u64,
    kind: Option<EventKind>,
    queue: Arc<ArrayQueue<Arc<EngineEvent>>>,
    dropped: Arc<AtomicU64>,
}

/// A subscriber's end of one subscription.
///
/// Poll or drain from the owning thread; the bus never pushes into a full
/// queue, so a subscriber that drains within its channel's bound observes
/// every event for its subscription.
pub struct Subscriber {
    id: u64,
    queue: Arc<ArrayQueue<Arc<EngineEvent>>>,
    dropped: Arc<AtomicU64>,
}

impl Subscriber {
    /// The subscription id, for [`EventBus::unsubscribe`].
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Take the oldest pending event, if any.
    pub fn poll(&self) -> Option<Arc<EngineEvent>> {
        self.queue.pop()
    }

    /// Take everything currently pending.
    pub fn drain(&self) -> Vec<Arc<EngineEvent>> {
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            out.push(event);
        }
        out
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events dropped because this subscriber's channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }
}

/// The typed publisher.
pub struct EventBus {
    subscriptions: RwLock<Vec<SubscriptionEntry>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to one event kind with a bounded channel.
    pub fn subscribe(&self, kind: EventKind, capacity: usize) -> Subscriber {
        self.add_subscription(Some(kind), capacity)
    }

    /// Subscribe to every event kind with a bounded channel.
    pub fn subscribe_all(&self, capacity: usize) -> Subscriber {
        self.add_subscription(None, capacity)
    }

    /// Remove a subscription. Pending events stay readable on the
    /// subscriber; nothing further is delivered.
    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        self.subscriptions
            .write()
            .retain(|entry| entry.id != subscriber.id);
    }

    /// Publish an event to every matching subscription. Never blocks; full
    /// subscribers lose the event and their drop counter is incremented.
    pub fn publish(&self, event: EngineEvent) {
        let kind = event.kind();
        let event = Arc::new(event);
        let subscriptions = self.subscriptions.read();
        for entry in subscriptions.iter() {
            if entry.kind.is_some_and(|k| k != kind) {
                continue;
            }
            if entry.queue.push(Arc::clone(&event)).is_err() {
                let total = entry.dropped.fetch_add(1, Ordering::AcqRel) + 1;
                trace!(
                    "subscriber {} lagging: {} events dropped",
                    entry.id, total
                );
            }
        }
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    fn add_subscription(&self, kind: Option<EventKind>, capacity: usize) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(ArrayQueue::new(capacity.max(1)));
        let dropped = Arc::new(AtomicU64::new(0));
        self.subscriptions.write().push(SubscriptionEntry {
            id,
            kind,
            queue: Arc::clone(&queue),
            dropped: Arc::clone(&dropped),
        });
        Subscriber { id, queue, dropped }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
