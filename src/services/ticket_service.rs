use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{TicketEntity, code_suffix},
    error::ServiceError,
    state::{QueueEvent, SharedState},
};

/// Issue a ticket for `service_id` and append it to the service queue.
///
/// The code lookup, the ticket write and the enqueue run under the service's issue gate, so
/// concurrent issuances for one service get distinct, increasing codes and enter the queue in
/// code order. Nothing is enqueued when a storage call fails.
pub async fn issue_ticket(
    state: &SharedState,
    service_id: Uuid,
) -> Result<TicketEntity, ServiceError> {
    let _work = state.begin_work().await;
    let store = state.require_store().await?;
    let Some(service) = state.bounded(store.find_service_type(service_id)).await? else {
        return Err(ServiceError::NotFound(format!(
            "service `{service_id}` not found"
        )));
    };

    let gate = state.service_gate(service.id);
    let _guard = gate.lock().await;
    let last = state
        .bounded(store.find_most_recent_ticket_code(service.id))
        .await?;
    let code = next_ticket_code(&service.tag, last.as_deref())?;
    let ticket = state.bounded(store.create_ticket(service.id, code)).await?;
    let length = state.queues().enqueue(service.id, ticket.clone());

    info!(
        service_id = %service.id,
        ticket_id = %ticket.id,
        code = %ticket.code,
        queue_length = length,
        "ticket issued"
    );
    state.events().publish(QueueEvent::QueueUpdated {
        service_id: service.id,
        length,
    });

    Ok(ticket)
}

/// Fetch a previously issued ticket.
pub async fn get_ticket(state: &SharedState, id: Uuid) -> Result<TicketEntity, ServiceError> {
    let store = state.require_store().await?;
    state
        .bounded(store.get_ticket_by_id(id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("ticket `{id}` not found")))
}

/// Code following `last` for a service tagged `tag`.
///
/// Without a previous ticket the sequence starts at 0. Otherwise the numeric suffix of the
/// previous code is incremented; a code without digits counts as 0. Fails once the sequence
/// cannot grow any further.
pub fn next_ticket_code(tag: &str, last: Option<&str>) -> Result<String, ServiceError> {
    let next = match last {
        None => 0,
        Some(code) => {
            let suffix = code.strip_prefix(tag).unwrap_or(code);
            let exhausted =
                || ServiceError::Internal(format!("ticket codes for `{tag}` exhausted at `{code}`"));
            match code_suffix(suffix) {
                Some(number) => number.checked_add(1).ok_or_else(exhausted)?,
                None if suffix.ends_with(|c: char| c.is_ascii_digit()) => return Err(exhausted()),
                None => 1,
            }
        }
    };
    Ok(format!("{tag}{next}"))
}
