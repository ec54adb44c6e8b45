use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Served tickets still waiting to be written to storage.
    #[serde(rename = "pendingRecords")]
    pub pending_records: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(pending_records: usize) -> Self {
        Self {
            status: "ok".to_string(),
            pending_records,
        }
    }

    /// Create a health response indicating the system is in degraded mode.
    pub fn degraded(pending_records: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            pending_records,
        }
    }
}
