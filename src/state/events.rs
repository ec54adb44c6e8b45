//! Synchronous publish/subscribe registry for queue notifications.

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::dao::models::TicketEntity;

/// Discriminant of a [`QueueEvent`], used to pick which listeners receive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    QueueUpdated,
    TicketCalled,
    TicketServed,
}

impl EventKind {
    /// Every kind, in a stable order.
    pub const ALL: [EventKind; 3] = [
        EventKind::QueueUpdated,
        EventKind::TicketCalled,
        EventKind::TicketServed,
    ];

    /// Wire name used by the SSE and WebSocket bridges.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::QueueUpdated => "queue_updated",
            EventKind::TicketCalled => "ticket_called",
            EventKind::TicketServed => "ticket_served",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification emitted by the ticket issuer and the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A queue changed length (ticket issued or dispatched).
    QueueUpdated { service_id: Uuid, length: usize },
    /// A ticket was taken off its queue for a counter.
    TicketCalled {
        service_id: Uuid,
        ticket: TicketEntity,
    },
    /// A ticket was handed to a counter.
    TicketServed {
        counter_id: Uuid,
        ticket: TicketEntity,
        service_id: Uuid,
    },
}

impl QueueEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            QueueEvent::QueueUpdated { .. } => EventKind::QueueUpdated,
            QueueEvent::TicketCalled { .. } => EventKind::TicketCalled,
            QueueEvent::TicketServed { .. } => EventKind::TicketServed,
        }
    }
}

/// Failure reported by a listener. Logged by the bus, never surfaced to the publisher.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl From<serde_json::Error> for ListenerError {
    fn from(err: serde_json::Error) -> Self {
        ListenerError(format!("failed to serialize event: {err}"))
    }
}

type Listener = Arc<dyn Fn(&QueueEvent) -> Result<(), ListenerError> + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    kind: EventKind,
    listener: Listener,
}

/// Observer registry delivering events synchronously, in registration order.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    registrations: RwLock<IndexMap<SubscriptionId, Registration>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&QueueEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Registration {
                    kind,
                    listener: Arc::new(listener),
                },
            );
        id
    }

    /// Remove a listener. Returns `false` when the handle was already unsubscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registrations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&id)
            .is_some()
    }

    /// Deliver `event` to every listener registered for its kind.
    ///
    /// Listener errors and panics are logged and skipped. Returns how many listeners
    /// accepted the event.
    pub fn publish(&self, event: QueueEvent) -> usize {
        let kind = event.kind();
        // Listeners run outside the lock so they may subscribe or unsubscribe themselves.
        let listeners: Vec<(SubscriptionId, Listener)> = self
            .registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, registration)| registration.kind == kind)
            .map(|(id, registration)| (*id, registration.listener.clone()))
            .collect();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    warn!(%kind, subscription = id.0, error = %err, "event listener failed")
                }
                Err(_) => error!(%kind, subscription = id.0, "event listener panicked"),
            }
        }
        delivered
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|registration| registration.kind == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn queue_updated(length: usize) -> QueueEvent {
        QueueEvent::QueueUpdated {
            service_id: Uuid::nil(),
            length,
        }
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.subscribe(EventKind::QueueUpdated, move |_| {
                seen.lock().unwrap().push(name);
                Ok(())
            });
        }

        assert_eq!(bus.publish(queue_updated(1)), 3);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn only_matching_kind_is_delivered() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        bus.subscribe(EventKind::TicketServed, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(bus.publish(queue_updated(0)), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let id = bus.subscribe(EventKind::QueueUpdated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(queue_updated(1));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(queue_updated(2));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(EventKind::QueueUpdated), 0);
    }

    #[test]
    fn failing_listeners_do_not_block_the_rest() {
        let bus = EventBus::new();
        let reached = Arc::new(AtomicU64::new(0));

        bus.subscribe(EventKind::QueueUpdated, |_| {
            Err(ListenerError("bridge offline".into()))
        });
        bus.subscribe(EventKind::QueueUpdated, |_| panic!("listener bug"));
        let counter = reached.clone();
        bus.subscribe(EventKind::QueueUpdated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(bus.publish(queue_updated(3)), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_kind_matches_variant() {
        assert_eq!(queue_updated(0).kind(), EventKind::QueueUpdated);
        assert_eq!(EventKind::TicketCalled.as_str(), "ticket_called");
    }
}
