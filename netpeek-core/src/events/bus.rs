//! Fan-out of decoded packets to any number of subscribers.
//!
//! Every subscriber owns a bounded queue (crossbeam `ArrayQueue`). Publishing never
//! blocks: when a subscriber's queue is full the **oldest** queued summary is evicted
//! to make room, and the eviction is counted against that subscriber. A slow reader
//! therefore loses history instead of stalling the capture feed or other readers.
//!
//! The subscriber set sits behind its own `RwLock`, independent of any session state.
//! Publish holds the read side for the whole fan-out and unsubscribe takes the write
//! side, so once `unsubscribe` returns no publish can reach the removed handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam::queue::ArrayQueue;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{debug, trace};

use super::packet::PacketSummary;
use crate::error::EventError;

/// Typed handle identity returned by [`Broadcaster::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of one publish across all subscribers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Older summaries evicted from full subscriber queues.
    pub evicted: usize,
}

struct Slot {
    queue: ArrayQueue<Arc<PacketSummary>>,
    notify: Notify,
    closed: AtomicBool,
    evicted: AtomicU64,
}

impl Slot {
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        while self.queue.pop().is_some() {}
        self.notify.notify_waiters();
        self.notify.notify_one();
    }
}

struct Inner {
    capacity: usize,
    next_id: AtomicU64,
    slots: RwLock<HashMap<SubscriptionId, Arc<Slot>>>,
}

impl Inner {
    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.slots.write().remove(&id);
        match removed {
            Some(slot) => {
                slot.close();
                debug!(subscription = %id, "Subscriber detached");
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle to a shared broadcaster.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Broadcaster {
    /// Creates a broadcaster whose subscribers each buffer up to `capacity` summaries.
    pub fn with_capacity(capacity: usize) -> Result<Self, EventError> {
        if capacity == 0 {
            return Err(EventError::InvalidCapacity);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                capacity,
                next_id: AtomicU64::new(1),
                slots: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn subscribe(&self) -> Subscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(Slot {
            queue: ArrayQueue::new(self.inner.capacity),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            evicted: AtomicU64::new(0),
        });

        self.inner.slots.write().insert(id, slot.clone());
        debug!(subscription = %id, "Subscriber attached");

        Subscription {
            id,
            slot,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Detaches a subscriber. Returns `false` if it was already detached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.remove(id)
    }

    /// Delivers `summary` to every current subscriber, in publish order per subscriber.
    pub fn publish(&self, summary: Arc<PacketSummary>) -> PublishReport {
        let mut report = PublishReport::default();
        let slots = self.inner.slots.read();

        for (id, slot) in slots.iter() {
            if let Some(evicted) = slot.queue.force_push(summary.clone()) {
                slot.evicted.fetch_add(1, Ordering::Relaxed);
                report.evicted += 1;
                trace!(subscription = %id, packet = %evicted.id, "Evicted oldest queued packet");
            }
            slot.notify.notify_one();
            report.delivered += 1;
        }

        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.slots.read().len()
    }

    /// Detaches every subscriber; pending `recv` calls resolve to `None`.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.inner.slots.write().drain().collect();
        for (id, slot) in drained {
            slot.close();
            debug!(subscription = %id, "Subscriber closed");
        }
    }
}

/// Receiving end of one subscription.
///
/// Dropping the handle unsubscribes it.
pub struct Subscription {
    id: SubscriptionId,
    slot: Arc<Slot>,
    bus: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next summary. Returns `None` once the subscription is closed.
    pub async fn recv(&self) -> Option<Arc<PacketSummary>> {
        loop {
            if self.is_closed() {
                return None;
            }
            if let Some(summary) = self.slot.queue.pop() {
                return Some(summary);
            }
            self.slot.notify.notified().await;
        }
    }

    pub fn try_recv(&self) -> Option<Arc<PacketSummary>> {
        if self.is_closed() {
            return None;
        }
        self.slot.queue.pop()
    }

    /// Number of summaries evicted from this subscriber's queue because it fell behind.
    pub fn evicted(&self) -> u64 {
        self.slot.evicted.load(Ordering::Relaxed)
    }

    pub fn pending(&self) -> usize {
        self.slot.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.slot.closed.load(Ordering::Acquire)
    }

    /// Detaches from the broadcaster. Idempotent.
    pub fn unsubscribe(&self) {
        match self.bus.upgrade() {
            Some(inner) => {
                inner.remove(self.id);
            }
            None => self.slot.close(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::packet::tests::summary;
    use std::time::Duration;

    fn publish_n(bus: &Broadcaster, range: std::ops::Range<u64>) {
        for id in range {
            bus.publish(Arc::new(summary(id, 8)));
        }
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(
            Broadcaster::with_capacity(0),
            Err(EventError::InvalidCapacity)
        ));
    }

    #[test]
    fn delivers_in_publish_order() {
        let bus = Broadcaster::with_capacity(16).unwrap();
        let sub = bus.subscribe();
        publish_n(&bus, 1..6);

        let received: Vec<u64> = std::iter::from_fn(|| sub.try_recv())
            .map(|s| s.id.0)
            .collect();
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn full_queue_evicts_oldest() {
        let bus = Broadcaster::with_capacity(3).unwrap();
        let sub = bus.subscribe();
        publish_n(&bus, 1..6);

        let received: Vec<u64> = std::iter::from_fn(|| sub.try_recv())
            .map(|s| s.id.0)
            .collect();
        assert_eq!(received, vec![3, 4, 5]);
        assert_eq!(sub.evicted(), 2);
    }

    #[test]
    fn slow_subscriber_does_not_affect_fast_one() {
        let bus = Broadcaster::with_capacity(2).unwrap();
        let slow = bus.subscribe();
        let fast = bus.subscribe();

        for id in 1..=10 {
            bus.publish(Arc::new(summary(id, 8)));
            assert_eq!(fast.try_recv().map(|s| s.id.0), Some(id));
        }

        assert_eq!(fast.evicted(), 0);
        assert_eq!(slow.evicted(), 8);
        assert_eq!(slow.pending(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = Broadcaster::with_capacity(8).unwrap();
        let sub = bus.subscribe();
        publish_n(&bus, 1..3);

        assert!(bus.unsubscribe(sub.id()));
        publish_n(&bus, 3..10);

        assert!(sub.is_closed());
        assert_eq!(sub.try_recv(), None);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = Broadcaster::with_capacity(8).unwrap();
        let sub = bus.subscribe();
        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn dropping_handle_detaches() {
        let bus = Broadcaster::with_capacity(8).unwrap();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn recv_wakes_on_publish() {
        let bus = Broadcaster::with_capacity(8).unwrap();
        let sub = bus.subscribe();

        let publisher = bus.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(Arc::new(summary(42, 8)));
        });

        let received = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap();
        assert_eq!(received.map(|s| s.id.0), Some(42));
        task.await.unwrap();
    }

    #[tokio::test]
    async fn recv_resolves_to_none_after_close_all() {
        let bus = Broadcaster::with_capacity(8).unwrap();
        let sub = bus.subscribe();

        let closer = bus.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close_all();
        });

        let received = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap();
        assert!(received.is_none());
        task.await.unwrap();
    }
}
