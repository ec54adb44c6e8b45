//! Per-service FIFO queues of issued tickets.

use std::collections::VecDeque;

use dashmap::DashMap;
use uuid::Uuid;

use crate::dao::models::TicketEntity;

/// Ticket removed from the head of a queue, with the length left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dequeued {
    pub ticket: TicketEntity,
    pub remaining: usize,
}

/// In-memory queues keyed by service type id.
///
/// Every operation on a given service id runs under that entry's shard lock, so `enqueue`,
/// `dequeue` and `length` are linearizable per service. The map itself is never exposed.
#[derive(Default)]
pub struct QueueStore {
    queues: DashMap<Uuid, VecDeque<TicketEntity>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `ticket` to the tail of the service queue, creating it if needed.
    /// Returns the queue length after the append.
    pub fn enqueue(&self, service_id: Uuid, ticket: TicketEntity) -> usize {
        let mut queue = self.queues.entry(service_id).or_default();
        queue.push_back(ticket);
        queue.len()
    }

    /// Remove and return the head ticket, or `None` when the queue is missing or empty.
    pub fn dequeue(&self, service_id: Uuid) -> Option<Dequeued> {
        let dequeued = {
            let mut queue = self.queues.get_mut(&service_id)?;
            let ticket = queue.pop_front()?;
            Dequeued {
                ticket,
                remaining: queue.len(),
            }
        };

        if dequeued.remaining == 0 {
            // Re-checked under the entry lock so a concurrent enqueue is never dropped.
            self.queues.remove_if(&service_id, |_, queue| queue.is_empty());
        }
        Some(dequeued)
    }

    /// Current number of queued tickets; 0 for an unknown service.
    pub fn length(&self, service_id: Uuid) -> usize {
        self.queues
            .get(&service_id)
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    /// Drop the whole queue of a service.
    pub fn clear(&self, service_id: Uuid) {
        self.queues.remove(&service_id);
    }

    /// Services that currently own a queue.
    pub fn service_ids(&self) -> Vec<Uuid> {
        self.queues.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread, time::SystemTime};

    use super::*;

    fn ticket(service_id: Uuid, code: &str) -> TicketEntity {
        TicketEntity {
            id: Uuid::new_v4(),
            code: code.into(),
            service_id,
            issued_at: SystemTime::now(),
        }
    }

    #[test]
    fn enqueue_grows_length_by_one() {
        let store = QueueStore::new();
        let service = Uuid::new_v4();

        assert_eq!(store.length(service), 0);
        assert_eq!(store.enqueue(service, ticket(service, "A0")), 1);
        assert_eq!(store.enqueue(service, ticket(service, "A1")), 2);
        assert_eq!(store.length(service), 2);
    }

    #[test]
    fn dequeue_preserves_fifo_order() {
        let store = QueueStore::new();
        let service = Uuid::new_v4();
        let tickets: Vec<_> = ["A0", "A1", "A2"]
            .into_iter()
            .map(|code| ticket(service, code))
            .collect();
        for t in &tickets {
            store.enqueue(service, t.clone());
        }

        let drained: Vec<_> = std::iter::from_fn(|| store.dequeue(service))
            .map(|dequeued| dequeued.ticket)
            .collect();
        assert_eq!(drained, tickets);
    }

    #[test]
    fn dequeue_reports_remaining_and_empty() {
        let store = QueueStore::new();
        let service = Uuid::new_v4();
        store.enqueue(service, ticket(service, "A0"));
        store.enqueue(service, ticket(service, "A1"));

        assert_eq!(store.dequeue(service).map(|d| d.remaining), Some(1));
        assert_eq!(store.dequeue(service).map(|d| d.remaining), Some(0));
        assert!(store.dequeue(service).is_none());
        assert!(store.dequeue(Uuid::new_v4()).is_none());
        assert!(store.service_ids().is_empty());
    }

    #[test]
    fn queues_are_independent_per_service() {
        let store = QueueStore::new();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        store.enqueue(s1, ticket(s1, "A0"));
        store.enqueue(s2, ticket(s2, "B0"));
        store.enqueue(s2, ticket(s2, "B1"));

        assert_eq!(store.length(s1), 1);
        assert_eq!(store.length(s2), 2);
    }

    #[test]
    fn clear_removes_the_queue() {
        let store = QueueStore::new();
        let service = Uuid::new_v4();
        store.enqueue(service, ticket(service, "A0"));

        store.clear(service);
        assert_eq!(store.length(service), 0);
        assert!(store.dequeue(service).is_none());
    }

    #[test]
    fn length_is_stable_without_mutation() {
        let store = QueueStore::new();
        let service = Uuid::new_v4();
        store.enqueue(service, ticket(service, "A0"));

        assert_eq!(store.length(service), store.length(service));
    }

    #[test]
    fn concurrent_dequeues_never_share_a_ticket() {
        let store = Arc::new(QueueStore::new());
        let service = Uuid::new_v4();
        let total = 200;
        for n in 0..total {
            store.enqueue(service, ticket(service, &format!("A{n}")));
        }

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(dequeued) = store.dequeue(service) {
                        taken.push(dequeued.ticket.id);
                    }
                    taken
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for id in worker.join().unwrap() {
                assert!(seen.insert(id), "ticket dequeued twice");
            }
        }
        assert_eq!(seen.len(), total);
        assert_eq!(store.length(service), 0);
    }

    #[test]
    fn enqueue_racing_dequeue_is_never_lost() {
        let store = Arc::new(QueueStore::new());
        let service = Uuid::new_v4();
        let total = 500;

        let producer = {
            let store = store.clone();
            thread::spawn(move || {
                for n in 0..total {
                    store.enqueue(service, ticket(service, &format!("A{n}")));
                }
            })
        };
        let consumer = {
            let store = store.clone();
            thread::spawn(move || {
                let mut codes = Vec::new();
                while codes.len() < total {
                    if let Some(dequeued) = store.dequeue(service) {
                        codes.push(dequeued.ticket.code);
                    }
                }
                codes
            })
        };

        producer.join().unwrap();
        let codes = consumer.join().unwrap();
        let expected: Vec<String> = (0..total).map(|n| format!("A{n}")).collect();
        assert_eq!(codes, expected);
    }
}
