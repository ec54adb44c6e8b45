use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::ticket::{IssueTicketRequest, TicketResponse},
    error::AppError,
    services::ticket_service,
    state::SharedState,
};

/// Ticket issuance and lookup endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/tickets/new", post(issue_ticket))
        .route("/api/v1/tickets/{id}", get(get_ticket))
}

#[utoipa::path(
    post,
    path = "/api/v1/tickets/new",
    tag = "tickets",
    request_body = IssueTicketRequest,
    responses(
        (status = 201, description = "Ticket issued and queued", body = TicketResponse),
        (status = 400, description = "Malformed service type id"),
        (status = 404, description = "Unknown service"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Issue a new ticket for the requested service and append it to that service's queue.
pub async fn issue_ticket(
    State(state): State<SharedState>,
    Json(payload): Json<IssueTicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), AppError> {
    payload.validate()?;
    let service_id = payload
        .service_type_id()
        .ok_or_else(|| AppError::BadRequest("serviceTypeId must be a UUID".into()))?;

    let ticket = ticket_service::issue_ticket(&state, service_id).await?;
    Ok((StatusCode::CREATED, Json(ticket.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Identifier of the ticket")),
    responses(
        (status = 200, description = "Ticket", body = TicketResponse),
        (status = 404, description = "Unknown ticket")
    )
)]
pub async fn get_ticket(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketResponse>, AppError> {
    Ok(Json(ticket_service::get_ticket(&state, id).await?.into()))
}
