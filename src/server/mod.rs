//! Web server module for the collaborative editor.
//!
//! This module contains the axum server surface: HTTP routes for state and
//! snapshots, the WebSocket endpoint, and the event types both sides speak.

pub mod message;
pub mod routes;
pub mod websocket;

pub use message::{ClientEvent, ServerEvent};
pub use routes::{AppState, create_router};
