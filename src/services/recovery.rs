//! Bringing a freshly connected store online.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::Catalog,
    dao::{models::TicketEntity, office_store::OfficeStore},
    error::ServiceError,
    services::dispatch_service,
    state::{QueueEvent, SharedState},
};

/// Seed the catalog, rebuild the queues from the store and leave degraded mode.
///
/// Fails without installing the store when any step cannot reach storage.
pub async fn bring_online(
    state: &SharedState,
    store: Arc<dyn OfficeStore>,
    catalog: &Catalog,
) -> Result<(), ServiceError> {
    seed_catalog(state, &store, catalog).await?;
    dispatch_service::flush_unrecorded(state, &store).await;
    let restored = restore_queues(state, &store).await?;

    state.set_store(store).await;
    state.update_degraded(false);
    info!(restored, "storage online; leaving degraded mode");
    Ok(())
}

/// Upsert every configured service type and counter.
pub async fn seed_catalog(
    state: &SharedState,
    store: &Arc<dyn OfficeStore>,
    catalog: &Catalog,
) -> Result<(), ServiceError> {
    for service in &catalog.services {
        state
            .bounded(store.upsert_service_type(service.clone()))
            .await?;
    }
    for counter in &catalog.counters {
        state.bounded(store.upsert_counter(counter.clone())).await?;
    }
    Ok(())
}

/// Replace the in-memory queues with the unserved tickets known to the store.
///
/// Waits for running issuances and dispatches so every ticket they touched is settled in the
/// store or in the backlog. Tickets already handed to a counter whose served record is still
/// pending are left out. Returns how many tickets were queued.
pub async fn restore_queues(
    state: &SharedState,
    store: &Arc<dyn OfficeStore>,
) -> Result<usize, ServiceError> {
    let _quiet = state.quiesce().await;
    let unserved = state.bounded(store.list_unserved_tickets()).await?;
    let in_flight = state.unrecorded_ticket_ids().await;

    let mut by_service: IndexMap<Uuid, Vec<TicketEntity>> = IndexMap::new();
    for ticket in unserved {
        if in_flight.contains(&ticket.id) {
            continue;
        }
        by_service.entry(ticket.service_id).or_default().push(ticket);
    }

    let mut touched = state.queues().service_ids();
    for service_id in &touched {
        state.queues().clear(*service_id);
    }

    let mut restored = 0;
    for (service_id, tickets) in by_service {
        let mut length = 0;
        for ticket in tickets {
            length = state.queues().enqueue(service_id, ticket);
            restored += 1;
        }
        if !touched.contains(&service_id) {
            touched.push(service_id);
        }
        if length > 0 {
            info!(%service_id, length, "restored queue from storage");
        }
    }

    for service_id in touched {
        let length = state.queues().length(service_id);
        state
            .events()
            .publish(QueueEvent::QueueUpdated { service_id, length });
    }

    if restored == 0 {
        debug!("no unserved tickets to restore");
    }
    Ok(restored)
}
