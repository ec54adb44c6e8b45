//! Process-local [`OfficeStore`] used when no database is configured and by the test-suite.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::time::sleep;
use uuid::Uuid;

use crate::dao::{
    models::{CounterEntity, ServedRecordEntity, ServiceTypeEntity, TicketEntity},
    office_store::OfficeStore,
    storage::{StorageError, StorageResult},
};

/// Store operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FindServiceType,
    ListCounterServices,
    FindMostRecentTicketCode,
    CreateTicket,
    AppendServedRecord,
    ListUnservedTickets,
    HealthCheck,
}

#[derive(Debug, Error)]
#[error("injected failure for {0:?}")]
struct InjectedFailure(StoreOperation);

/// Dashmap-backed store. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryOfficeStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    service_types: DashMap<Uuid, ServiceTypeEntity>,
    counters: DashMap<Uuid, CounterEntity>,
    tickets: DashMap<Uuid, StoredTicket>,
    issued_by_service: DashMap<Uuid, Vec<Uuid>>,
    served: DashMap<Uuid, ServedRecordEntity>,
    next_order: AtomicU64,
    failures: DashMap<StoreOperation, u32>,
    latency_ms: AtomicU64,
}

struct StoredTicket {
    order: u64,
    ticket: TicketEntity,
}

impl MemoryOfficeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls of `operation` fail with an unavailable error.
    pub fn fail_next(&self, operation: StoreOperation, times: u32) {
        self.inner.failures.insert(operation, times);
    }

    /// Delay every operation by `latency`, simulating a slow backend.
    pub fn set_latency(&self, latency: Duration) {
        self.inner
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Remove a ticket record out of band, as an operator editing the database would.
    pub fn delete_ticket(&self, id: Uuid) -> bool {
        self.inner.tickets.remove(&id).is_some()
    }

    /// Snapshot of every served record, in no particular order.
    pub fn served_records(&self) -> Vec<ServedRecordEntity> {
        self.inner
            .served
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl MemoryInner {
    async fn enter(&self, operation: StoreOperation) -> StorageResult<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            sleep(Duration::from_millis(latency)).await;
        }

        let injected = match self.failures.get_mut(&operation) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };

        if injected {
            return Err(StorageError::unavailable(
                format!("memory store {operation:?} failed"),
                InjectedFailure(operation),
            ));
        }
        Ok(())
    }

    fn most_recent_code(&self, service_id: Uuid) -> Option<String> {
        let issued = self.issued_by_service.get(&service_id)?;
        issued
            .iter()
            .rev()
            .find_map(|id| self.tickets.get(id).map(|stored| stored.ticket.code.clone()))
    }

    fn create_ticket(&self, service_id: Uuid, code: String) -> TicketEntity {
        let ticket = TicketEntity {
            id: Uuid::new_v4(),
            code,
            service_id,
            issued_at: SystemTime::now(),
        };
        let order = self.next_order.fetch_add(1, Ordering::SeqCst);
        self.tickets.insert(
            ticket.id,
            StoredTicket {
                order,
                ticket: ticket.clone(),
            },
        );
        self.issued_by_service
            .entry(service_id)
            .or_default()
            .push(ticket.id);
        ticket
    }

    fn unserved_tickets(&self) -> Vec<TicketEntity> {
        let mut pending: Vec<(u64, TicketEntity)> = self
            .tickets
            .iter()
            .filter(|entry| !self.served.contains_key(entry.key()))
            .map(|entry| (entry.order, entry.ticket.clone()))
            .collect();
        pending.sort_by_key(|(order, _)| *order);
        pending.into_iter().map(|(_, ticket)| ticket).collect()
    }

    fn append_served_record(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        served_at: SystemTime,
        ended_at: Option<SystemTime>,
    ) -> StorageResult<ServedRecordEntity> {
        if !self.tickets.contains_key(&ticket_id) {
            return Err(StorageError::rejected(format!(
                "ticket `{ticket_id}` does not exist"
            )));
        }

        match self.served.entry(ticket_id) {
            Entry::Occupied(_) => Err(StorageError::rejected(format!(
                "ticket `{ticket_id}` already has a served record"
            ))),
            Entry::Vacant(slot) => {
                let record = ServedRecordEntity {
                    id: Uuid::new_v4(),
                    ticket_id,
                    counter_id,
                    served_at,
                    ended_at,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }
}

impl OfficeStore for MemoryOfficeStore {
    fn find_service_type(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ServiceTypeEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.enter(StoreOperation::FindServiceType).await?;
            Ok(inner.service_types.get(&id).map(|entry| entry.clone()))
        })
    }

    fn list_service_types(&self) -> BoxFuture<'static, StorageResult<Vec<ServiceTypeEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut services: Vec<ServiceTypeEntity> = inner
                .service_types
                .iter()
                .map(|entry| entry.value().clone())
                .collect();
            services.sort_by(|a, b| a.tag.cmp(&b.tag));
            Ok(services)
        })
    }

    fn upsert_service_type(
        &self,
        service: ServiceTypeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.service_types.insert(service.id, service);
            Ok(())
        })
    }

    fn list_counter_services(&self, counter_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.enter(StoreOperation::ListCounterServices).await?;
            Ok(inner
                .counters
                .get(&counter_id)
                .map(|counter| counter.service_ids.clone())
                .unwrap_or_default())
        })
    }

    fn upsert_counter(&self, counter: CounterEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.counters.insert(counter.id, counter);
            Ok(())
        })
    }

    fn find_most_recent_ticket_code(
        &self,
        service_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.enter(StoreOperation::FindMostRecentTicketCode).await?;
            Ok(inner.most_recent_code(service_id))
        })
    }

    fn create_ticket(
        &self,
        service_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<TicketEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.enter(StoreOperation::CreateTicket).await?;
            Ok(inner.create_ticket(service_id, code))
        })
    }

    fn get_ticket_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TicketEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.tickets.get(&id).map(|stored| stored.ticket.clone())) })
    }

    fn list_unserved_tickets(&self) -> BoxFuture<'static, StorageResult<Vec<TicketEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.enter(StoreOperation::ListUnservedTickets).await?;
            Ok(inner.unserved_tickets())
        })
    }

    fn append_served_record(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        served_at: SystemTime,
        ended_at: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<ServedRecordEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.enter(StoreOperation::AppendServedRecord).await?;
            inner.append_served_record(ticket_id, counter_id, served_at, ended_at)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.enter(StoreOperation::HealthCheck).await })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(tag: &str) -> ServiceTypeEntity {
        ServiceTypeEntity {
            id: Uuid::new_v4(),
            tag: tag.into(),
            average_service_time: 300,
            description: None,
        }
    }

    #[tokio::test]
    async fn most_recent_code_skips_deleted_tickets() {
        let store = MemoryOfficeStore::new();
        let service = service("A");
        store.upsert_service_type(service.clone()).await.unwrap();

        let first = store.create_ticket(service.id, "A0".into()).await.unwrap();
        let second = store.create_ticket(service.id, "A1".into()).await.unwrap();
        assert_eq!(
            store.find_most_recent_ticket_code(service.id).await.unwrap(),
            Some("A1".into())
        );

        assert!(store.delete_ticket(first.id));
        assert_eq!(
            store.find_most_recent_ticket_code(service.id).await.unwrap(),
            Some("A1".into())
        );

        assert!(store.delete_ticket(second.id));
        assert_eq!(
            store.find_most_recent_ticket_code(service.id).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn unserved_tickets_come_back_in_issuance_order() {
        let store = MemoryOfficeStore::new();
        let a = service("A");
        let b = service("B");

        let a0 = store.create_ticket(a.id, "A0".into()).await.unwrap();
        let b0 = store.create_ticket(b.id, "B0".into()).await.unwrap();
        let a1 = store.create_ticket(a.id, "A1".into()).await.unwrap();

        store
            .append_served_record(b0.id, Uuid::new_v4(), SystemTime::now(), None)
            .await
            .unwrap();

        let pending = store.list_unserved_tickets().await.unwrap();
        assert_eq!(pending, vec![a0, a1]);
    }

    #[tokio::test]
    async fn served_record_is_written_once() {
        let store = MemoryOfficeStore::new();
        let ticket = store
            .create_ticket(Uuid::new_v4(), "A0".into())
            .await
            .unwrap();
        let counter = Uuid::new_v4();

        store
            .append_served_record(ticket.id, counter, SystemTime::now(), None)
            .await
            .unwrap();
        let err = store
            .append_served_record(ticket.id, counter, SystemTime::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));
        assert_eq!(store.served_records().len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryOfficeStore::new();
        store.fail_next(StoreOperation::CreateTicket, 1);

        assert!(store.create_ticket(Uuid::new_v4(), "A0".into()).await.is_err());
        assert!(store.create_ticket(Uuid::new_v4(), "A0".into()).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_counter_serves_nothing() {
        let store = MemoryOfficeStore::new();
        assert!(
            store
                .list_counter_services(Uuid::new_v4())
                .await
                .unwrap()
                .is_empty()
        );
    }
}
