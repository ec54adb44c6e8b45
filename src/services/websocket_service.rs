use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{
    dto::{sse::ServerEvent, ws::DisplayFrame},
    services::sse_service,
    state::SharedState,
};

/// Push queue events to a display board until it disconnects.
///
/// Displays are read-only: inbound text is ignored and only close frames are honoured.
pub async fn handle_display_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (handshake, mut events) = sse_service::subscribe_public(&state);
    info!(clients = state.display().subscriber_count(), "display connected");

    if let Some(handshake) = handshake {
        if !send_event(&mut sender, &handshake).await {
            return;
        }
    }

    loop {
        tokio::select! {
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    warn!(error = %err, "display websocket receive error");
                    break;
                }
            },
            outbound = events.recv() => match outbound {
                Ok(event) => {
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "display client lagging; skipping events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    let _ = sender.close().await;
    info!("display disconnected");
}

/// Returns `false` once the socket can no longer be written to.
async fn send_event<S>(sender: &mut S, event: &ServerEvent) -> bool
where
    S: Sink<Message> + Unpin,
{
    let text = match DisplayFrame::from_server_event(event).and_then(|frame| frame.to_text()) {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "failed to encode display frame; skipping");
            return true;
        }
    };
    sender.send(Message::Text(text.into())).await.is_ok()
}
