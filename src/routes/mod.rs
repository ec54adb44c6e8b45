use axum::Router;

use crate::state::SharedState;

pub mod counters;
pub mod docs;
pub mod health;
pub mod services;
pub mod sse;
pub mod tickets;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(services::router())
        .merge(tickets::router())
        .merge(counters::router())
        .merge(sse::router())
        .merge(websocket::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
