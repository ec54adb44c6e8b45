pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{CounterEntity, ServedRecordEntity, ServiceTypeEntity, TicketEntity};
use crate::dao::storage::StorageResult;

pub use memory::MemoryOfficeStore;

/// Abstraction over the persistence layer for the service catalog, issued tickets and served
/// history. The in-memory queues are owned by the core; this trait only stores durable records.
pub trait OfficeStore: Send + Sync {
    fn find_service_type(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ServiceTypeEntity>>>;
    fn list_service_types(&self) -> BoxFuture<'static, StorageResult<Vec<ServiceTypeEntity>>>;
    fn upsert_service_type(
        &self,
        service: ServiceTypeEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Service types a counter may serve, in the counter's preference order.
    /// Unknown counters yield an empty list.
    fn list_counter_services(&self, counter_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<Uuid>>>;
    fn upsert_counter(&self, counter: CounterEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Code of the most recently issued ticket still present for a service.
    fn find_most_recent_ticket_code(
        &self,
        service_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<String>>>;
    fn create_ticket(
        &self,
        service_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<TicketEntity>>;
    fn get_ticket_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TicketEntity>>>;
    /// Issued tickets without a served record, oldest first.
    fn list_unserved_tickets(&self) -> BoxFuture<'static, StorageResult<Vec<TicketEntity>>>;
    /// Append the served record for a ticket. Fails when one already exists.
    fn append_served_record(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        served_at: SystemTime,
        ended_at: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<ServedRecordEntity>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
