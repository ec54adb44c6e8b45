use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the office queue backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::services::list_services,
        crate::routes::services::get_service,
        crate::routes::services::get_queue_length,
        crate::routes::tickets::issue_ticket,
        crate::routes::tickets::get_ticket,
        crate::routes::counters::call_next,
        crate::routes::sse::public_stream,
        crate::routes::websocket::display_ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::service::ServiceResponse,
            crate::dto::service::QueueLengthResponse,
            crate::dto::ticket::IssueTicketRequest,
            crate::dto::ticket::TicketResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::QueueUpdatedEvent,
            crate::dto::sse::TicketCalledEvent,
            crate::dto::sse::TicketServedEvent,
            crate::dto::ws::DisplayFrame,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "services", description = "Service catalog and queue lengths"),
        (name = "tickets", description = "Ticket issuance"),
        (name = "counters", description = "Counter dispatch"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "displays", description = "WebSocket feed for display boards"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_dispatch_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/counters/{id}/next"));
        assert!(doc.paths.paths.contains_key("/api/v1/tickets/new"));
    }
}
