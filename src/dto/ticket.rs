use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::TicketEntity,
    dto::{format_system_time, validation::validate_uuid_string},
};

/// Kiosk request for a new ticket.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct IssueTicketRequest {
    /// Identifier of the requested service type.
    #[validate(custom(function = "validate_uuid_string"))]
    pub service_type_id: String,
}

impl IssueTicketRequest {
    /// Parsed service type id; only meaningful once the request has been validated.
    pub fn service_type_id(&self) -> Option<Uuid> {
        Uuid::parse_str(self.service_type_id.trim()).ok()
    }
}

/// Issued ticket as returned to the kiosk and to counters.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub ticket_id: Uuid,
    /// Human-facing code such as `A12`.
    pub ticket_code: String,
    /// RFC 3339 issuance timestamp.
    pub issued_at: String,
    pub service_id: Uuid,
}

impl From<TicketEntity> for TicketResponse {
    fn from(ticket: TicketEntity) -> Self {
        Self {
            ticket_id: ticket.id,
            ticket_code: ticket.code,
            issued_at: format_system_time(ticket.issued_at),
            service_id: ticket.service_id,
        }
    }
}

impl From<&TicketEntity> for TicketResponse {
    fn from(ticket: &TicketEntity) -> Self {
        ticket.clone().into()
    }
}
