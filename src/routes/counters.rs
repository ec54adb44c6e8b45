use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::ticket::TicketResponse, error::AppError, services::dispatch_service, state::SharedState,
};

/// Counter operations.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/v1/counters/{id}/next", post(call_next))
}

#[utoipa::path(
    post,
    path = "/api/v1/counters/{id}/next",
    tag = "counters",
    params(("id" = Uuid, Path, description = "Identifier of the counter")),
    responses(
        (status = 200, description = "Ticket handed to the counter", body = TicketResponse),
        (status = 404, description = "Unknown counter or counter serving nothing"),
        (status = 409, description = "No ticket waiting for this counter"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Take the next ticket this counter should serve.
pub async fn call_next(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketResponse>, AppError> {
    Ok(Json(dispatch_service::dispatch_next(&state, id).await?.into()))
}
