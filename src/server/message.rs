//! WebSocket event types.
//!
//! Both directions use tagged JSON. Client events are whole-document pushes
//! and snapshot commands; server events carry state, operations, and
//! per-session errors.

use serde::{Deserialize, Serialize};

use crate::crdt::Operation;

/// Events a client sends to the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// The full text the client wants the document to become. The cursor
    /// position is accepted on the wire but not used server-side.
    TextChange {
        value: String,
        #[serde(default)]
        cursor: Option<usize>,
    },
    /// Capture the current document state.
    CreateSnapshot,
    /// Restore a previously captured snapshot.
    RevertToSnapshot { id: String },
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The whole document, sent once on session start.
    InitialState { value: String },
    /// One replicated operation for incremental application.
    Operation { op: Operation },
    /// The whole document, sent after a revert or a detected divergence.
    FullStateUpdate { value: String },
    /// The snapshot index changed.
    SnapshotsUpdated { snapshots: Vec<String> },
    /// A failure addressed to a single session.
    Error { message: String },
}
