use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::ServiceTypeEntity;

/// Service type as exposed to kiosks and displays.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    pub service_id: Uuid,
    /// Short uppercase prefix used in ticket codes.
    pub tag_name: String,
    /// Expected handling time of one ticket, in seconds.
    pub average_service_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<ServiceTypeEntity> for ServiceResponse {
    fn from(service: ServiceTypeEntity) -> Self {
        Self {
            service_id: service.id,
            tag_name: service.tag,
            average_service_time: service.average_service_time,
            description: service.description,
        }
    }
}

/// Current number of tickets waiting for a service.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueLengthResponse {
    pub service_id: Uuid,
    pub length: usize,
}
