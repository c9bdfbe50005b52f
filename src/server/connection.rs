//! Event-channel connection handling
//!
//! Each WebSocket connection runs two tasks: a writer draining the
//! session's outbound queue, and a reader feeding inbound text frames to
//! the hub one at a time. When either side finishes the other is stopped
//! and the session is torn down.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::OwnedSemaphorePermit;

use crate::error::ProtocolError;
use crate::hub::Hub;
use crate::session::SessionContext;

/// One event-channel connection
pub struct Connection {
    hub: Arc<Hub>,
    peer_addr: SocketAddr,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Connection {
    /// Create a connection; the permit is held until the session ends
    pub fn new(hub: Arc<Hub>, peer_addr: SocketAddr, permit: Option<OwnedSemaphorePermit>) -> Self {
        Self {
            hub,
            peer_addr,
            _permit: permit,
        }
    }

    /// Run the session until either side closes
    pub async fn run(self, socket: WebSocket) {
        let (session_id, mut events) = self.hub.connect().await;
        let context = SessionContext::new(session_id, self.peer_addr);

        tracing::debug!(
            session_id = %session_id,
            peer = %context.peer_addr,
            "Event channel open"
        );

        let (mut sink, mut stream) = socket.split();

        let mut send_task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(
                            session_id = %session_id,
                            event = event.name(),
                            error = %e,
                            "Failed to encode event"
                        );
                        continue;
                    }
                };

                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let hub = Arc::clone(&self.hub);
        let mut recv_task = tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(Message::Text(text)) => hub.handle_text(session_id, &text).await,
                    Ok(Message::Binary(_)) => hub.reject(session_id, ProtocolError::BinaryFrame),
                    Ok(Message::Close(_)) => break,
                    // Pong is handled automatically by axum
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
        });

        // Wait for the aborted task so no event is handled after disconnect
        tokio::select! {
            _ = &mut send_task => {
                recv_task.abort();
                let _ = recv_task.await;
            }
            _ = &mut recv_task => {
                send_task.abort();
                let _ = send_task.await;
            }
        }

        self.hub.disconnect(session_id).await;

        tracing::info!(
            session_id = %session_id,
            peer = %context.peer_addr,
            duration_ms = context.duration().as_millis() as u64,
            "Session disconnected"
        );
    }
}
