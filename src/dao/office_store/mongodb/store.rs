use std::{collections::HashSet, sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
    models::{
        COUNTER_COLLECTION, MongoCounterDocument, MongoServedDocument, MongoServiceTypeDocument,
        MongoTicketDocument, SERVED_COLLECTION, SERVICE_TYPE_COLLECTION, TICKET_COLLECTION,
        doc_id,
    },
};
use crate::dao::{
    models::{CounterEntity, ServedRecordEntity, ServiceTypeEntity, TicketEntity},
    office_store::OfficeStore,
    storage::StorageResult,
};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoOfficeStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = self.config.open_database().await?;
        let mut guard = self.database.write().await;
        *guard = database;
        Ok(())
    }
}

impl MongoOfficeStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = config.open_database().await?;

        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let tickets = self.collection::<MongoTicketDocument>(TICKET_COLLECTION).await;
        let latest_index = IndexModel::builder()
            .keys(doc! {"service_id": 1, "issued_at": -1, "sequence": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("ticket_service_latest_idx".to_owned()))
                    .build(),
            )
            .build();
        tickets
            .create_index(latest_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TICKET_COLLECTION,
                index: "service_id,issued_at,sequence",
                source,
            })?;

        // One served record per ticket.
        let served = self.collection::<MongoServedDocument>(SERVED_COLLECTION).await;
        let served_index = IndexModel::builder()
            .keys(doc! {"ticket_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("served_ticket_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        served
            .create_index(served_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SERVED_COLLECTION,
                index: "ticket_id",
                source,
            })?;

        Ok(())
    }

    async fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let guard = self.inner.database.read().await;
        guard.collection::<T>(name)
    }

    async fn find_service_type(&self, id: Uuid) -> MongoResult<Option<ServiceTypeEntity>> {
        let collection = self
            .collection::<MongoServiceTypeDocument>(SERVICE_TYPE_COLLECTION)
            .await;

        collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadServiceType { id, source })?
            .map(ServiceTypeEntity::try_from)
            .transpose()
    }

    async fn list_service_types(&self) -> MongoResult<Vec<ServiceTypeEntity>> {
        let collection = self
            .collection::<MongoServiceTypeDocument>(SERVICE_TYPE_COLLECTION)
            .await;

        let documents: Vec<MongoServiceTypeDocument> = collection
            .find(doc! {})
            .sort(doc! {"tag": 1})
            .await
            .map_err(|source| MongoDaoError::ListServiceTypes { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListServiceTypes { source })?;

        documents
            .into_iter()
            .map(ServiceTypeEntity::try_from)
            .collect()
    }

    async fn upsert_service_type(&self, service: ServiceTypeEntity) -> MongoResult<()> {
        let id = service.id;
        let document: MongoServiceTypeDocument = service.into();
        let collection = self
            .collection::<MongoServiceTypeDocument>(SERVICE_TYPE_COLLECTION)
            .await;

        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveServiceType { id, source })?;
        Ok(())
    }

    async fn list_counter_services(&self, counter_id: Uuid) -> MongoResult<Vec<Uuid>> {
        let collection = self
            .collection::<MongoCounterDocument>(COUNTER_COLLECTION)
            .await;

        let counter = collection
            .find_one(doc_id(counter_id))
            .await
            .map_err(|source| MongoDaoError::LoadCounter {
                id: counter_id,
                source,
            })?;

        match counter {
            Some(document) => document.service_ids(),
            None => Ok(Vec::new()),
        }
    }

    async fn upsert_counter(&self, counter: CounterEntity) -> MongoResult<()> {
        let id = counter.id;
        let document: MongoCounterDocument = counter.into();
        let collection = self
            .collection::<MongoCounterDocument>(COUNTER_COLLECTION)
            .await;

        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveCounter { id, source })?;
        Ok(())
    }

    async fn find_most_recent_ticket_code(&self, service_id: Uuid) -> MongoResult<Option<String>> {
        let collection = self
            .collection::<MongoTicketDocument>(TICKET_COLLECTION)
            .await;

        let latest = collection
            .find_one(doc! {"service_id": service_id.to_string()})
            .sort(doc! {"issued_at": -1, "sequence": -1})
            .await
            .map_err(|source| MongoDaoError::LoadLatestTicket { service_id, source })?;

        Ok(latest.map(|document| document.code().to_owned()))
    }

    async fn create_ticket(&self, service_id: Uuid, code: String) -> MongoResult<TicketEntity> {
        let document = MongoTicketDocument::new(service_id, code.clone());
        let collection = self
            .collection::<MongoTicketDocument>(TICKET_COLLECTION)
            .await;

        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::CreateTicket {
                service_id,
                code,
                source,
            })?;

        TicketEntity::try_from(document)
    }

    async fn get_ticket_by_id(&self, id: Uuid) -> MongoResult<Option<TicketEntity>> {
        let collection = self
            .collection::<MongoTicketDocument>(TICKET_COLLECTION)
            .await;

        collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadTicket { id, source })?
            .map(TicketEntity::try_from)
            .transpose()
    }

    async fn list_unserved_tickets(&self) -> MongoResult<Vec<TicketEntity>> {
        let served = self
            .collection::<MongoServedDocument>(SERVED_COLLECTION)
            .await;
        let served_ids: HashSet<String> = served
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListUnserved { source })?
            .try_collect::<Vec<MongoServedDocument>>()
            .await
            .map_err(|source| MongoDaoError::ListUnserved { source })?
            .into_iter()
            .map(|document| document.ticket_id)
            .collect();

        let tickets = self
            .collection::<MongoTicketDocument>(TICKET_COLLECTION)
            .await;
        let documents: Vec<MongoTicketDocument> = tickets
            .find(doc! {})
            .sort(doc! {"issued_at": 1, "sequence": 1})
            .await
            .map_err(|source| MongoDaoError::ListUnserved { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListUnserved { source })?;

        documents
            .into_iter()
            .filter(|document| !served_ids.contains(&document.id))
            .map(TicketEntity::try_from)
            .collect()
    }

    async fn append_served_record(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        served_at: SystemTime,
        ended_at: Option<SystemTime>,
    ) -> MongoResult<ServedRecordEntity> {
        if self.get_ticket_by_id(ticket_id).await?.is_none() {
            return Err(MongoDaoError::UnknownTicket { ticket_id });
        }

        let record = ServedRecordEntity {
            id: Uuid::new_v4(),
            ticket_id,
            counter_id,
            served_at,
            ended_at,
        };
        let document: MongoServedDocument = record.clone().into();
        let collection = self
            .collection::<MongoServedDocument>(SERVED_COLLECTION)
            .await;

        collection
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicateServedRecord { ticket_id }
                } else {
                    MongoDaoError::SaveServedRecord { ticket_id, source }
                }
            })?;

        Ok(record)
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

impl OfficeStore for MongoOfficeStore {
    fn find_service_type(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ServiceTypeEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_service_type(id).await.map_err(Into::into) })
    }

    fn list_service_types(&self) -> BoxFuture<'static, StorageResult<Vec<ServiceTypeEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_service_types().await.map_err(Into::into) })
    }

    fn upsert_service_type(
        &self,
        service: ServiceTypeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_service_type(service).await.map_err(Into::into) })
    }

    fn list_counter_services(&self, counter_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_counter_services(counter_id)
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_counter(&self, counter: CounterEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_counter(counter).await.map_err(Into::into) })
    }

    fn find_most_recent_ticket_code(
        &self,
        service_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_most_recent_ticket_code(service_id)
                .await
                .map_err(Into::into)
        })
    }

    fn create_ticket(
        &self,
        service_id: Uuid,
        code: String,
    ) -> BoxFuture<'static, StorageResult<TicketEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .create_ticket(service_id, code)
                .await
                .map_err(Into::into)
        })
    }

    fn get_ticket_by_id(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TicketEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.get_ticket_by_id(id).await.map_err(Into::into) })
    }

    fn list_unserved_tickets(&self) -> BoxFuture<'static, StorageResult<Vec<TicketEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_unserved_tickets().await.map_err(Into::into) })
    }

    fn append_served_record(
        &self,
        ticket_id: Uuid,
        counter_id: Uuid,
        served_at: SystemTime,
        ended_at: Option<SystemTime>,
    ) -> BoxFuture<'static, StorageResult<ServedRecordEntity>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .append_served_record(ticket_id, counter_id, served_at, ended_at)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
