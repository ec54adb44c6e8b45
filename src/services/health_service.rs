use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) = state.bounded(store.health_check()).await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let pending = state.unrecorded_ticket_ids().await.len();
    if state.is_degraded() {
        HealthResponse::degraded(pending)
    } else {
        HealthResponse::ok(pending)
    }
}
