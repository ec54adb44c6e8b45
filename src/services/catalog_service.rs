use uuid::Uuid;

use crate::{dao::models::ServiceTypeEntity, error::ServiceError, state::SharedState};

/// Every configured service type.
pub async fn list_services(state: &SharedState) -> Result<Vec<ServiceTypeEntity>, ServiceError> {
    let store = state.require_store().await?;
    state.bounded(store.list_service_types()).await
}

/// One service type by id.
pub async fn get_service(
    state: &SharedState,
    service_id: Uuid,
) -> Result<ServiceTypeEntity, ServiceError> {
    let store = state.require_store().await?;
    state
        .bounded(store.find_service_type(service_id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("service `{service_id}` not found")))
}

/// Number of tickets waiting for a known service.
pub async fn queue_length(state: &SharedState, service_id: Uuid) -> Result<usize, ServiceError> {
    let service = get_service(state, service_id).await?;
    Ok(state.queues().length(service.id))
}
