use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::dto::sse::ServerEvent;

#[derive(Debug, Serialize, ToSchema)]
/// Text frame pushed to display WebSocket clients.
pub struct DisplayFrame {
    /// Event name, e.g. `ticket_called`.
    #[serde(rename = "type")]
    pub kind: String,
    #[schema(value_type = Object)]
    pub payload: Value,
}

impl DisplayFrame {
    /// Wrap an already serialised event so it can be sent as one JSON text frame.
    pub fn from_server_event(event: &ServerEvent) -> serde_json::Result<Self> {
        Ok(Self {
            kind: event.event.clone().unwrap_or_else(|| "message".into()),
            payload: serde_json::from_str(&event.data)?,
        })
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_embeds_payload_as_json() {
        let event = ServerEvent {
            event: Some("queue_updated".into()),
            data: r#"{"length":2}"#.into(),
        };

        let text = DisplayFrame::from_server_event(&event)
            .unwrap()
            .to_text()
            .unwrap();
        assert_eq!(text, r#"{"type":"queue_updated","payload":{"length":2}}"#);
    }
}
