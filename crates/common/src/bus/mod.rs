//! Typed notification bus
//!
//! Decouples the synchronization core from its observers (tray, logs, UI).
//! Subscription is type-based: one handler is registered per message type,
//! and `publish` dispatches to every handler registered for that type.
//!
//! Two dispatch modes are supported:
//! - [`NotificationBus::subscribe`]: synchronous, invoked inline on the
//!   publishing thread (ordering-sensitive observers)
//! - [`NotificationBus::subscribe_background`]: asynchronous fan-out through
//!   a per-subscriber channel drained by a dedicated task, preserving
//!   per-subscriber delivery order
//!
//! Unsubscribing is explicit and safe to call during dispatch: `publish`
//! snapshots the handler set before invoking anything.

mod messages;

pub use messages::{
    AggregatedFileEventStatus, FileExecutionFailed, FileExecutionStarted, FileExecutionSucceeded,
    InformationMessage, WarningMessage,
};

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Marker trait for values that can travel over the bus
///
/// Messages are immutable value objects; `publish` hands each background
/// subscriber its own clone.
pub trait Notification: Clone + Send + Sync + 'static {}

/// Identifier handed out by `subscribe`, used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<M> = Arc<dyn Fn(&M) + Send + Sync>;
type HandlerList<M> = Vec<(SubscriptionId, Handler<M>)>;

/// Process-wide publish/subscribe channel
///
/// Cheap to clone; all clones share the same handler registry.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    handlers: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    next_id: AtomicU64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                handlers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a synchronous handler for one message type
    ///
    /// The handler runs inline on the publishing thread, so it must be
    /// fast and must not block.
    pub fn subscribe<M, F>(&self, handler: F) -> SubscriptionId
    where
        M: Notification,
        F: Fn(&M) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.inner.handlers.write();
        let list = handlers
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Box::new(HandlerList::<M>::new()))
            .downcast_mut::<HandlerList<M>>()
            .expect("handler list type keyed by TypeId");
        list.push((id, Arc::new(handler)));
        id
    }

    /// Register a handler dispatched from a background task
    ///
    /// Each background subscriber gets its own unbounded channel; `publish`
    /// only clones the message into the channel, and a dedicated task drains
    /// it in order. The task exits when the subscription is removed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_background<M, F>(&self, handler: F) -> SubscriptionId
    where
        M: Notification,
        F: Fn(M) + Send + Sync + 'static,
    {
        let (tx, rx) = flume::unbounded::<M>();
        tokio::spawn(async move {
            while let Ok(msg) = rx.recv_async().await {
                handler(msg);
            }
        });
        self.subscribe::<M, _>(move |msg: &M| {
            // Receiver dropped means the dispatch task is gone; the stale
            // subscription is harmless and removable via unsubscribe.
            let _ = tx.send(msg.clone());
        })
    }

    /// Remove a subscription for the given message type
    ///
    /// Safe to call while a `publish` of the same type is in progress; the
    /// in-progress dispatch finishes with its snapshot.
    pub fn unsubscribe<M: Notification>(&self, id: SubscriptionId) {
        let mut handlers = self.inner.handlers.write();
        if let Some(list) = handlers
            .get_mut(&TypeId::of::<M>())
            .and_then(|l| l.downcast_mut::<HandlerList<M>>())
        {
            list.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// Deliver a message to every handler registered for its type
    ///
    /// Synchronous handlers run on the calling thread in registration
    /// order; background subscribers receive their clone without blocking
    /// the publisher. Messages published from a single thread arrive at
    /// each subscriber in publish order.
    pub fn publish<M: Notification>(&self, message: M) {
        let snapshot: HandlerList<M> = {
            let handlers = self.inner.handlers.read();
            match handlers
                .get(&TypeId::of::<M>())
                .and_then(|l| l.downcast_ref::<HandlerList<M>>())
            {
                Some(list) => list.clone(),
                None => return,
            }
        };
        for (_, handler) in &snapshot {
            handler(&message);
        }
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.inner.handlers.read();
        f.debug_struct("NotificationBus")
            .field("message_types", &handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);
    impl Notification for Ping {}

    #[derive(Debug, Clone)]
    struct Pong;
    impl Notification for Pong {}

    #[test]
    fn test_publish_reaches_subscriber() {
        let bus = NotificationBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        bus.subscribe::<Ping, _>(move |msg| {
            seen_clone.fetch_add(msg.0 as usize, Ordering::SeqCst);
        });

        bus.publish(Ping(3));
        bus.publish(Ping(4));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_subscription_is_type_scoped() {
        let bus = NotificationBus::new();
        let pings = Arc::new(AtomicUsize::new(0));

        let pings_clone = pings.clone();
        bus.subscribe::<Ping, _>(move |_| {
            pings_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Pong);
        assert_eq!(pings.load(Ordering::SeqCst), 0);

        bus.publish(Ping(1));
        assert_eq!(pings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = NotificationBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = seen.clone();
        let id = bus.subscribe::<Ping, _>(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(Ping(1));
        bus.unsubscribe::<Ping>(id);
        bus.publish(Ping(2));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_is_safe() {
        let bus = NotificationBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        // The first handler removes the second mid-dispatch; the snapshot
        // taken by publish still delivers to both for this message.
        let bus_clone = bus.clone();
        let second = Arc::new(parking_lot::Mutex::new(None::<SubscriptionId>));
        let second_clone = second.clone();
        bus.subscribe::<Ping, _>(move |_| {
            if let Some(id) = second_clone.lock().take() {
                bus_clone.unsubscribe::<Ping>(id);
            }
        });

        let seen_clone = seen.clone();
        let id = bus.subscribe::<Ping, _>(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });
        *second.lock() = Some(id);

        bus.publish(Ping(1));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        bus.publish(Ping(2));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_background_subscriber_receives_in_order() {
        let bus = NotificationBus::new();
        let (done_tx, done_rx) = flume::unbounded();

        bus.subscribe_background::<Ping, _>(move |msg| {
            done_tx.send(msg.0).unwrap();
        });

        for i in 0..10 {
            bus.publish(Ping(i));
        }

        let mut received = Vec::new();
        for _ in 0..10 {
            received.push(done_rx.recv_async().await.unwrap());
        }
        assert_eq!(received, (0..10).collect::<Vec<_>>());
    }
}
