//! Route handlers for the collaborative editor server.
//!
//! This module contains the HTTP route definitions and delegates WebSocket
//! handling to the dedicated websocket module.

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, ws::WebSocketUpgrade},
    response::{Json, Response},
    routing::get,
};
use serde::Serialize;

use crate::coordinator::Coordinator;
use crate::server::websocket::handle_websocket_connection;

/// Shared application state: the per-document coordination hub.
pub type AppState = Arc<Coordinator>;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct StateResponse {
    pub value: String,
}

#[derive(Serialize)]
pub struct SnapshotsResponse {
    pub snapshots: Vec<String>,
}

/// Basic health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Returns the current full document text.
pub async fn get_state(State(hub): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse {
        value: hub.value().await,
    })
}

/// Returns the available snapshot ids, newest first.
pub async fn get_snapshots(State(hub): State<AppState>) -> Json<SnapshotsResponse> {
    Json(SnapshotsResponse {
        snapshots: hub.list_snapshots(),
    })
}

/// WebSocket connection handler for collaborative editing.
pub async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, hub))
}

/// Creates and configures the main application router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(get_state))
        .route("/api/snapshots", get(get_snapshots))
        .route("/ws", get(ws_handler))
}
