//! HTTP routes
//!
//! `GET /ws` upgrades to the event channel. The remaining routes are plain
//! JSON: health, the active device list, and federation ingress.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::json;
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use crate::federation::RELAY_PATH;
use crate::hub::Hub;
use crate::protocol::FramePacket;
use crate::server::connection::Connection;

/// Shared state for route handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    /// Event-channel connection limit, if any
    pub connections: Option<Arc<Semaphore>>,
}

/// Build the hub router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/api/devices", get(devices_handler))
        .route(RELAY_PATH, post(relay_frame_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    // Check connection limit
    let permit = match &state.connections {
        Some(sem) => match Arc::clone(sem).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        },
        None => None,
    };

    let connection = Connection::new(state.hub, peer_addr, permit);
    ws.on_upgrade(move |socket| connection.run(socket))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.health().await)
}

async fn devices_handler(State(state): State<AppState>) -> impl IntoResponse {
    let devices = state.hub.registry().active_devices().await;
    Json(json!({ "devices": devices }))
}

/// Federation ingress: fan out a frame relayed by a peer hub
async fn relay_frame_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match FramePacket::decode(&body) {
        Ok(frame) => {
            state.hub.relay_inbound_frame(frame).await;
            Json(json!({ "status": "ok" })).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected relayed frame");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
