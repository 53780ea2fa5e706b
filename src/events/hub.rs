use axum::{
    extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::hooks::{ExecutionEvent, ExecutionListener, WebsocketHook};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
enum HubMessage {
    Event(Utf8Bytes),
    Close,
}

/// Fans execution events out to every connected websocket client.
pub struct EventHub {
    tx: broadcast::Sender<HubMessage>,
}

impl EventHub {
    /// `capacity` is how many events a session may fall behind by before it
    /// starts skipping.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send `event` to every open session.
    pub fn publish(&self, event: &ExecutionEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize execution event");
                return;
            }
        };
        // No receivers just means nobody is watching.
        let _ = self.tx.send(HubMessage::Event(json.into()));
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl WebsocketHook for EventHub {
    fn upgrade(&self, ws: WebSocketUpgrade) -> Response {
        let rx = self.tx.subscribe();
        ws.on_upgrade(move |socket| run_session(socket, rx))
    }

    fn close_sessions(&self) {
        if self.tx.send(HubMessage::Close).is_ok() {
            tracing::debug!("Closing websocket sessions");
        }
    }
}

impl ExecutionListener for EventHub {
    fn on_execution_event(&self, event: &ExecutionEvent) {
        self.publish(event);
    }
}

async fn run_session(socket: WebSocket, mut rx: broadcast::Receiver<HubMessage>) {
    let session_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    tracing::debug!(session_id = %session_id, "Websocket session opened");

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Ok(HubMessage::Event(json)) => {
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Ok(HubMessage::Close) | Err(RecvError::Closed) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %session_id, skipped, "Websocket session lagging");
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(session_id = %session_id, message = %text.as_str(), "Websocket client message");
                }
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!(session_id = %session_id, "Websocket session closed");
}
