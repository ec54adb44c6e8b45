use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::service::{QueueLengthResponse, ServiceResponse},
    error::AppError,
    services::catalog_service,
    state::SharedState,
};

/// Read-only catalog endpoints used by kiosks and displays.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/services", get(list_services))
        .route("/api/v1/services/{id}", get(get_service))
        .route("/api/v1/services/{id}/queue", get(get_queue_length))
}

#[utoipa::path(
    get,
    path = "/api/v1/services",
    tag = "services",
    responses(
        (status = 200, description = "Configured service types", body = [ServiceResponse]),
        (status = 503, description = "Storage unavailable")
    )
)]
/// List every service type a ticket can be issued for.
pub async fn list_services(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ServiceResponse>>, AppError> {
    let services = catalog_service::list_services(&state).await?;
    Ok(Json(services.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/services/{id}",
    tag = "services",
    params(("id" = Uuid, Path, description = "Identifier of the service type")),
    responses(
        (status = 200, description = "Service type", body = ServiceResponse),
        (status = 404, description = "Unknown service")
    )
)]
pub async fn get_service(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceResponse>, AppError> {
    Ok(Json(catalog_service::get_service(&state, id).await?.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/services/{id}/queue",
    tag = "services",
    params(("id" = Uuid, Path, description = "Identifier of the service type")),
    responses(
        (status = 200, description = "Tickets waiting for the service", body = QueueLengthResponse),
        (status = 404, description = "Unknown service")
    )
)]
/// Return how many tickets are waiting for a service.
pub async fn get_queue_length(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueLengthResponse>, AppError> {
    let length = catalog_service::queue_length(&state, id).await?;
    Ok(Json(QueueLengthResponse {
        service_id: id,
        length,
    }))
}
