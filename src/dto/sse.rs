use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::ticket::TicketResponse, state::QueueEvent};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE and display channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Render a queue notification with its wire name and JSON payload.
    pub fn from_queue_event(event: &QueueEvent) -> serde_json::Result<Self> {
        let name = event.kind().as_str().to_string();
        match event {
            QueueEvent::QueueUpdated { service_id, length } => Self::json(
                name,
                &QueueUpdatedEvent {
                    service_id: *service_id,
                    length: *length,
                },
            ),
            QueueEvent::TicketCalled { service_id, ticket } => Self::json(
                name,
                &TicketCalledEvent {
                    service_id: *service_id,
                    ticket: ticket.into(),
                },
            ),
            QueueEvent::TicketServed {
                counter_id,
                ticket,
                service_id,
            } => Self::json(
                name,
                &TicketServedEvent {
                    counter_id: *counter_id,
                    service_id: *service_id,
                    ticket: ticket.into(),
                },
            ),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to a display client when it connects.
pub struct Handshake {
    /// Identifier of the stream (`public` or `display`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast whenever a queue grows or shrinks.
pub struct QueueUpdatedEvent {
    pub service_id: Uuid,
    pub length: usize,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a ticket leaves its queue.
pub struct TicketCalledEvent {
    pub service_id: Uuid,
    pub ticket: TicketResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a ticket has been handed to a counter.
pub struct TicketServedEvent {
    pub counter_id: Uuid,
    pub service_id: Uuid,
    pub ticket: TicketResponse,
}
