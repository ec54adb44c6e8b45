use tracing::{debug, warn};

use crate::{
    dto::sse::{ServerEvent, SystemStatus},
    state::{EventBus, EventKind, ListenerError, SseHub},
};

const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Forward every queue notification published on `bus` to display clients on `hub`.
pub fn attach_display_bridge(bus: &EventBus, hub: &SseHub) {
    for kind in EventKind::ALL {
        let hub = hub.clone();
        bus.subscribe(kind, move |event| {
            let message = ServerEvent::from_queue_event(event)?;
            if hub.subscriber_count() == 0 {
                debug!(%kind, "no display client connected");
            }
            hub.broadcast(message);
            Ok::<(), ListenerError>(())
        });
    }
}

/// Tell display clients that the backend entered or left degraded mode.
pub fn broadcast_system_status(hub: &SseHub, degraded: bool) {
    match ServerEvent::json(
        Some(EVENT_SYSTEM_STATUS.to_string()),
        &SystemStatus { degraded },
    ) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(error = %err, "failed to serialize system status payload"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;
    use crate::{dao::models::TicketEntity, state::QueueEvent};

    #[test]
    fn every_kind_reaches_the_hub() {
        let bus = EventBus::new();
        let hub = SseHub::new(16);
        let mut rx = hub.subscribe();
        attach_display_bridge(&bus, &hub);

        let service_id = Uuid::new_v4();
        let ticket = TicketEntity {
            id: Uuid::new_v4(),
            code: "A0".into(),
            service_id,
            issued_at: SystemTime::now(),
        };
        bus.publish(QueueEvent::QueueUpdated {
            service_id,
            length: 1,
        });
        bus.publish(QueueEvent::TicketCalled {
            service_id,
            ticket: ticket.clone(),
        });
        bus.publish(QueueEvent::TicketServed {
            counter_id: Uuid::new_v4(),
            ticket,
            service_id,
        });

        let names: Vec<_> = (0..3)
            .map(|_| rx.try_recv().unwrap().event.unwrap())
            .collect();
        assert_eq!(names, vec!["queue_updated", "ticket_called", "ticket_served"]);
    }

    #[test]
    fn system_status_is_broadcast() {
        let hub = SseHub::new(4);
        let mut rx = hub.subscribe();

        broadcast_system_status(&hub, true);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_SYSTEM_STATUS));
        assert_eq!(event.data, r#"{"degraded":true}"#);
    }
}
