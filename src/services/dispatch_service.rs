//! Selection of the next ticket a counter should serve.
//!
//! Dispatch runs in two steps. [`plan_dispatch`] resolves the counter's services and keeps
//! the candidates tied at the longest queue, ordered by average service time. [`execute_plan`]
//! then walks those candidates and takes the first ticket it can dequeue. A queue drained
//! between the two steps makes the walk fall through to the next tied candidate; queue lengths
//! are never recomputed.

use std::{sync::Arc, time::SystemTime};

use indexmap::IndexSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{models::TicketEntity, office_store::OfficeStore},
    error::ServiceError,
    state::{QueueEvent, SharedState, UnrecordedServe},
};

/// Service that may provide the next ticket for a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub service_id: Uuid,
    pub queue_length: usize,
    pub average_service_time: u32,
}

/// Tied candidates chosen for one counter, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    pub counter_id: Uuid,
    pub candidates: Vec<Candidate>,
}

/// Pick, dequeue and record the next ticket for `counter_id`.
///
/// Queue recovery waits until the served record is written or parked in the backlog.
pub async fn dispatch_next(
    state: &SharedState,
    counter_id: Uuid,
) -> Result<TicketEntity, ServiceError> {
    let _work = state.begin_work().await;
    let plan = plan_dispatch(state, counter_id).await?;
    execute_plan(state, plan).await
}

/// Resolve the counter's services and select the candidates tied at the longest queue.
pub async fn plan_dispatch(
    state: &SharedState,
    counter_id: Uuid,
) -> Result<DispatchPlan, ServiceError> {
    let store = state.require_store().await?;
    let service_ids: IndexSet<Uuid> = state
        .bounded(store.list_counter_services(counter_id))
        .await?
        .into_iter()
        .collect();

    if service_ids.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "counter `{counter_id}` not found or serves nothing"
        )));
    }

    let mut considered = Vec::with_capacity(service_ids.len());
    for service_id in service_ids {
        let Some(service) = state.bounded(store.find_service_type(service_id)).await? else {
            warn!(%counter_id, %service_id, "counter references unknown service type; skipping");
            continue;
        };
        considered.push(Candidate {
            service_id,
            queue_length: state.queues().length(service_id),
            average_service_time: service.average_service_time,
        });
    }

    let candidates = select_candidates(considered);
    if candidates.is_empty() {
        return Err(no_tickets(counter_id));
    }

    Ok(DispatchPlan {
        counter_id,
        candidates,
    })
}

/// Keep the candidates tied at the longest non-empty queue, shortest service time first.
///
/// Candidates with equal service time stay in input order.
pub fn select_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let longest = candidates
        .iter()
        .map(|candidate| candidate.queue_length)
        .max()
        .unwrap_or(0);
    if longest == 0 {
        return Vec::new();
    }

    let mut tied: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| candidate.queue_length == longest)
        .collect();
    tied.sort_by_key(|candidate| candidate.average_service_time);
    tied
}

/// Dequeue from the first planned candidate that still has a ticket, then record the hand-off.
///
/// A served record that cannot be written does not fail the dispatch: the ticket already left
/// its queue, so it is returned and the record is kept for a later retry.
pub async fn execute_plan(
    state: &SharedState,
    plan: DispatchPlan,
) -> Result<TicketEntity, ServiceError> {
    let store = state.require_store().await?;
    let DispatchPlan {
        counter_id,
        candidates,
    } = plan;

    for candidate in candidates {
        let gate = state.service_gate(candidate.service_id);
        let service_guard = gate.lock().await;
        let Some(dequeued) = state.queues().dequeue(candidate.service_id) else {
            info!(
                %counter_id,
                service_id = %candidate.service_id,
                "planned queue drained concurrently; trying next candidate"
            );
            continue;
        };

        let ticket = dequeued.ticket;
        if ticket.service_id != candidate.service_id {
            error!(
                %counter_id,
                queue = %candidate.service_id,
                ticket_id = %ticket.id,
                ticket_service = %ticket.service_id,
                "ticket found in a foreign queue"
            );
            return Err(ServiceError::Internal(format!(
                "ticket `{}` was queued under service `{}`",
                ticket.id, candidate.service_id
            )));
        }

        state.events().publish(QueueEvent::TicketCalled {
            service_id: candidate.service_id,
            ticket: ticket.clone(),
        });
        state.events().publish(QueueEvent::QueueUpdated {
            service_id: candidate.service_id,
            length: dequeued.remaining,
        });
        drop(service_guard);

        record_served(state, &store, &ticket, counter_id).await;

        info!(
            %counter_id,
            service_id = %candidate.service_id,
            code = %ticket.code,
            "ticket dispatched"
        );
        state.events().publish(QueueEvent::TicketServed {
            counter_id,
            ticket: ticket.clone(),
            service_id: candidate.service_id,
        });
        return Ok(ticket);
    }

    Err(no_tickets(counter_id))
}

async fn record_served(
    state: &SharedState,
    store: &Arc<dyn OfficeStore>,
    ticket: &TicketEntity,
    counter_id: Uuid,
) {
    let served_at = SystemTime::now();
    let result = state
        .bounded(store.append_served_record(ticket.id, counter_id, served_at, None))
        .await;

    if let Err(err) = result {
        error!(
            %counter_id,
            ticket_id = %ticket.id,
            error = %err,
            "failed to record served ticket; queued for reconciliation"
        );
        state
            .push_unrecorded(UnrecordedServe {
                ticket_id: ticket.id,
                counter_id,
                served_at,
            })
            .await;
    }
}

/// Retry writing the served records that failed during dispatch.
///
/// Returns how many records were written. Records that fail again stay in the backlog; records
/// the store rejects outright (already written) are dropped.
pub async fn flush_unrecorded(state: &SharedState, store: &Arc<dyn OfficeStore>) -> usize {
    let pending = state.take_unrecorded().await;
    if pending.is_empty() {
        return 0;
    }

    let mut written = 0;
    let mut failed = Vec::new();
    for serve in pending {
        let result = state
            .bounded(store.append_served_record(
                serve.ticket_id,
                serve.counter_id,
                serve.served_at,
                None,
            ))
            .await;
        match result {
            Ok(_) => written += 1,
            Err(ServiceError::Storage(err)) if err.is_rejected() => {
                warn!(ticket_id = %serve.ticket_id, error = %err, "dropping unrecordable served ticket");
            }
            Err(err) => {
                warn!(ticket_id = %serve.ticket_id, error = %err, "served record still pending");
                failed.push(serve);
            }
        }
    }

    if written > 0 {
        info!(written, pending = failed.len(), "reconciled served records");
    }
    for serve in failed {
        state.push_unrecorded(serve).await;
    }
    written
}

fn no_tickets(counter_id: Uuid) -> ServiceError {
    ServiceError::NoTicketsAvailable(format!("no tickets waiting for counter `{counter_id}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(length: usize, average: u32) -> Candidate {
        Candidate {
            service_id: Uuid::new_v4(),
            queue_length: length,
            average_service_time: average,
        }
    }

    #[test]
    fn longest_queue_wins_regardless_of_service_time() {
        let short = candidate(2, 10);
        let long = candidate(5, 900);

        let selected = select_candidates(vec![short, long.clone()]);
        assert_eq!(selected, vec![long]);
    }

    #[test]
    fn ties_prefer_shorter_service_time() {
        let slow = candidate(3, 400);
        let fast = candidate(3, 200);

        let selected = select_candidates(vec![slow.clone(), fast.clone()]);
        assert_eq!(selected, vec![fast, slow]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let first = candidate(1, 300);
        let second = candidate(1, 300);

        let selected = select_candidates(vec![first.clone(), second.clone()]);
        assert_eq!(selected, vec![first, second]);
    }

    #[test]
    fn empty_queues_select_nothing() {
        assert!(select_candidates(vec![candidate(0, 10), candidate(0, 20)]).is_empty());
        assert!(select_candidates(Vec::new()).is_empty());
    }
}
