//! WebSocket session management for collaborative editing.
//!
//! Each connection attaches to the coordinator as a listener, receives the
//! initial document state, and then runs a select loop between outbound
//! server events and inbound client frames.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::coordinator::{Coordinator, SessionId};
use crate::server::message::{ClientEvent, ServerEvent};

/// One client's side of the broadcast group.
struct WebSocketSession {
    sender: SplitSink<WebSocket, Message>,
    hub: Arc<Coordinator>,
    session_id: SessionId,
}

impl WebSocketSession {
    /// Serializes and sends one event; returns false when the socket is gone.
    async fn send_event(&mut self, event: &ServerEvent) -> bool {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                error!(session = %self.session_id, error = %e, "failed to serialize event");
                return true;
            }
        };
        self.sender.send(Message::Text(json)).await.is_ok()
    }

    /// Parses and dispatches one inbound frame. Parse failures are logged and
    /// ignored without dropping the connection.
    async fn handle_text_frame(&self, text: &str) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "ignoring unparseable client event");
                return;
            }
        };

        match event {
            ClientEvent::TextChange { value, .. } => {
                self.hub.handle_text_change(self.session_id, &value).await;
            }
            ClientEvent::CreateSnapshot => {
                self.hub.create_snapshot(self.session_id).await;
            }
            ClientEvent::RevertToSnapshot { id } => {
                self.hub.revert_to_snapshot(self.session_id, &id).await;
            }
        }
    }

    async fn run(
        mut self,
        mut receiver: SplitStream<WebSocket>,
        mut events: mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        info!(session = %self.session_id, "websocket session established");

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if !self.send_event(&event).await {
                        break;
                    }
                }
                incoming = receiver.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_frame(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if self.sender.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!(session = %self.session_id, "session closed by client");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Binary and pong frames are ignored.
                        }
                        Some(Err(e)) => {
                            warn!(session = %self.session_id, error = %e, "websocket error");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        info!(session = %self.session_id, "websocket session ended");
    }
}

/// Attaches a new session to the coordinator and drives it until the
/// connection ends, detaching on the way out.
pub async fn handle_websocket_connection(socket: WebSocket, hub: Arc<Coordinator>) {
    let session_id = SessionId::next();
    let (tx, events) = mpsc::unbounded_channel();
    hub.attach_listener(session_id, tx);
    hub.on_client_connect(session_id).await;

    let (sender, receiver) = socket.split();
    let session = WebSocketSession {
        sender,
        hub: hub.clone(),
        session_id,
    };
    session.run(receiver, events).await;

    hub.detach_listener(session_id);
}
