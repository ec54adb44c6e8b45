use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Category of office service customers can queue for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceTypeEntity {
    /// Stable identifier for the service type.
    pub id: Uuid,
    /// Short tag prefixed to every ticket code issued for this service (e.g. "A").
    pub tag: String,
    /// Expected handling time in seconds, used to break ties between equally long queues.
    pub average_service_time: u32,
    /// Optional human readable description.
    pub description: Option<String>,
}

/// Service point staffed by an officer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterEntity {
    /// Stable identifier for the counter.
    pub id: Uuid,
    /// Display name (e.g. "Counter 1").
    pub name: String,
    /// Service types this counter may serve, in preference order.
    pub service_ids: Vec<Uuid>,
}

/// Claim-check issued to a customer. Never mutated once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketEntity {
    /// Primary key of the ticket.
    pub id: Uuid,
    /// Human readable code, `<tag><sequence>`.
    pub code: String,
    /// Service type the ticket was issued for.
    pub service_id: Uuid,
    /// Issuance timestamp.
    pub issued_at: SystemTime,
}

/// Append-only proof that a ticket was handed to a counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServedRecordEntity {
    /// Primary key of the record.
    pub id: Uuid,
    /// Ticket that was served.
    pub ticket_id: Uuid,
    /// Counter the ticket was handed to.
    pub counter_id: Uuid,
    /// Time of the hand-off.
    pub served_at: SystemTime,
    /// End of service, when the surrounding application tracks it.
    pub ended_at: Option<SystemTime>,
}

/// Parse the trailing decimal digits of a ticket code.
///
/// Returns `None` when the code has no numeric suffix or the suffix overflows.
pub fn code_suffix(code: &str) -> Option<u64> {
    let prefix_len = code.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    code[prefix_len..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_suffix_reads_trailing_digits() {
        assert_eq!(code_suffix("A0"), Some(0));
        assert_eq!(code_suffix("MAIL42"), Some(42));
        assert_eq!(code_suffix("A"), None);
        assert_eq!(code_suffix(""), None);
        assert_eq!(code_suffix("A99999999999999999999999"), None);
    }
}
