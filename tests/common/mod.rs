#![allow(dead_code)]

use std::sync::Arc;

use office_queue_back::{
    config::{Catalog, counter_id_for_name, service_id_for_tag},
    dao::{
        models::{CounterEntity, ServiceTypeEntity},
        office_store::{MemoryOfficeStore, OfficeStore},
    },
    services::recovery,
    state::{AppState, SharedState, StateSettings},
};
use uuid::Uuid;

pub fn service(tag: &str, average_service_time: u32) -> ServiceTypeEntity {
    ServiceTypeEntity {
        id: service_id_for_tag(tag),
        tag: tag.to_string(),
        average_service_time,
        description: None,
    }
}

pub fn counter(name: &str, tags: &[&str]) -> CounterEntity {
    CounterEntity {
        id: counter_id_for_name(name),
        name: name.to_string(),
        service_ids: tags.iter().map(|tag| service_id_for_tag(tag)).collect(),
    }
}

pub fn catalog(services: Vec<ServiceTypeEntity>, counters: Vec<CounterEntity>) -> Catalog {
    Catalog { services, counters }
}

pub fn id(tag: &str) -> Uuid {
    service_id_for_tag(tag)
}

pub fn counter_id(name: &str) -> Uuid {
    counter_id_for_name(name)
}

/// Shared state backed by a fresh memory store holding `catalog`, already online.
pub async fn online(catalog: &Catalog) -> (SharedState, MemoryOfficeStore) {
    online_with(catalog, StateSettings::default()).await
}

pub async fn online_with(
    catalog: &Catalog,
    settings: StateSettings,
) -> (SharedState, MemoryOfficeStore) {
    let store = MemoryOfficeStore::new();
    let state = AppState::with_settings(settings);
    attach(&state, &store, catalog).await;
    (state, store)
}

/// Bring `store` online for `state`.
pub async fn attach(state: &SharedState, store: &MemoryOfficeStore, catalog: &Catalog) {
    let handle: Arc<dyn OfficeStore> = Arc::new(store.clone());
    recovery::bring_online(state, handle, catalog)
        .await
        .expect("memory store comes online");
}
