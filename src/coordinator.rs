//! Replication coordination for one document.
//!
//! The coordinator bridges the engine on this site and the rest of the
//! world: it fans locally generated operations out to the replication
//! channel and to attached realtime sessions, filters inbound channel
//! traffic for self-origination, and owns the in-memory snapshot map.
//!
//! All engine access goes through one `RwLock` per document; no I/O happens
//! while an engine guard is held.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::broker::RedisBroker;
use crate::crdt::{Operation, Rga, SerializedState};
use crate::error::Error;
use crate::server::message::ServerEvent;
use crate::translate;

/// Process-unique identifier for an attached realtime session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocates the next session id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        SessionId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// The per-document coordination hub.
pub struct Coordinator {
    engine: tokio::sync::RwLock<Rga>,
    listeners: RwLock<HashMap<SessionId, mpsc::UnboundedSender<ServerEvent>>>,
    snapshots: RwLock<BTreeMap<String, SerializedState>>,
    broker: Option<RedisBroker>,
    channel: String,
}

impl Coordinator {
    /// Wraps an engine. A missing broker means replication is disabled:
    /// local edits still apply and broadcast to attached sessions.
    pub fn new(engine: Rga, broker: Option<RedisBroker>, channel: impl Into<String>) -> Self {
        Coordinator {
            engine: tokio::sync::RwLock::new(engine),
            listeners: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(BTreeMap::new()),
            broker,
            channel: channel.into(),
        }
    }

    /// The current document text.
    pub async fn value(&self) -> String {
        self.engine.read().await.value()
    }

    /// Registers a session's outbound event channel.
    pub fn attach_listener(&self, session: SessionId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.listeners.write().insert(session, tx);
        debug!(%session, "listener attached");
    }

    /// Removes a session from the broadcast group.
    pub fn detach_listener(&self, session: SessionId) {
        self.listeners.write().remove(&session);
        debug!(%session, "listener detached");
    }

    /// Number of attached sessions.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Pushes the current document to a freshly connected session.
    pub async fn on_client_connect(&self, session: SessionId) {
        let value = self.engine.read().await.value();
        self.send_to(session, ServerEvent::InitialState { value });
    }

    fn send_to(&self, session: SessionId, event: ServerEvent) {
        if let Some(tx) = self.listeners.read().get(&session) {
            // The session may be mid-disconnect; an undeliverable event is
            // simply dropped.
            let _ = tx.send(event);
        }
    }

    fn broadcast(&self, event: &ServerEvent, skip: Option<SessionId>) {
        for (session, tx) in self.listeners.read().iter() {
            if Some(*session) == skip {
                continue;
            }
            let _ = tx.send(event.clone());
        }
    }

    /// Handles a whole-document push from a client: diff, apply, publish,
    /// broadcast to everyone but the author.
    pub async fn handle_text_change(&self, origin: SessionId, desired_text: &str) {
        let outcome = {
            let mut engine = self.engine.write().await;
            match translate::apply_text_change(&mut engine, desired_text) {
                Ok(ops) => {
                    let value = engine.value();
                    let diverged = if value != desired_text { Some(value) } else { None };
                    Ok((ops, diverged))
                }
                Err(e) => Err((e, engine.value())),
            }
        };

        match outcome {
            Ok((ops, diverged)) => {
                if let Some(value) = diverged {
                    warn!(%origin, "document diverged from client text, forcing resync");
                    self.broadcast(&ServerEvent::FullStateUpdate { value }, None);
                }
                for op in ops {
                    self.publish_outward(&op).await;
                    self.broadcast(&ServerEvent::Operation { op }, Some(origin));
                }
            }
            Err((e, value)) => {
                error!(%origin, error = %e, "failed to translate text change");
                self.broadcast(&ServerEvent::FullStateUpdate { value }, None);
                self.send_to(
                    origin,
                    ServerEvent::Error {
                        message: "server error processing change, please reload".to_string(),
                    },
                );
            }
        }
    }

    /// Sends one operation to the other server replicas.
    pub async fn publish_outward(&self, op: &Operation) {
        match &self.broker {
            Some(broker) => broker.publish(&self.channel, op).await,
            None => debug!("replication disabled, operation not published"),
        }
    }

    /// Handles one operation delivered by the replication channel: drop our
    /// own echoes, integrate, then fan out to every attached session.
    pub async fn on_inbound_from_channel(&self, op: Operation) {
        let Some(origin_site) = op.origin_site() else {
            debug!("ignoring originless operation from channel");
            return;
        };
        {
            let mut engine = self.engine.write().await;
            if origin_site == engine.site_id() {
                debug!("ignoring own operation echoed from channel");
                return;
            }
            engine.apply_remote(op.clone());
        }
        self.broadcast(&ServerEvent::Operation { op }, None);
    }

    /// Captures the current state under a sortable timestamp id and tells
    /// every session the snapshot list changed.
    pub async fn create_snapshot(&self, origin: SessionId) {
        let state = self.engine.read().await.serialize_state();
        let snapshot_id = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let snapshots = {
            let mut map = self.snapshots.write();
            map.insert(snapshot_id.clone(), state);
            map.keys().rev().cloned().collect::<Vec<_>>()
        };
        info!(%origin, snapshot = %snapshot_id, "snapshot created");
        self.broadcast(&ServerEvent::SnapshotsUpdated { snapshots }, None);
    }

    /// Snapshot ids, newest first.
    pub fn list_snapshots(&self) -> Vec<String> {
        self.snapshots.read().keys().rev().cloned().collect()
    }

    /// Replaces the engine with the named snapshot's state and resyncs every
    /// session with the restored document. Unknown ids only produce an error
    /// event for the requester.
    pub async fn revert_to_snapshot(&self, origin: SessionId, snapshot_id: &str) {
        let Some(state) = self.snapshots.read().get(snapshot_id).cloned() else {
            warn!(%origin, snapshot = %snapshot_id, "revert to unknown snapshot");
            self.send_to(
                origin,
                ServerEvent::Error {
                    message: Error::UnknownSnapshot(snapshot_id.to_string()).to_string(),
                },
            );
            return;
        };

        let value = {
            let mut engine = self.engine.write().await;
            *engine = Rga::deserialize_state(state);
            engine.value()
        };
        info!(%origin, snapshot = %snapshot_id, "reverted to snapshot");
        self.broadcast(&ServerEvent::FullStateUpdate { value }, None);
    }

    /// Starts consuming the document channel, if replication is enabled.
    /// The caller drives the returned receiver into
    /// [`Coordinator::on_inbound_from_channel`].
    pub async fn subscribe_replication(&self) -> Option<mpsc::UnboundedReceiver<Operation>> {
        let broker = self.broker.as_ref()?;
        match broker.subscribe(&self.channel).await {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!(error = %e, "failed to subscribe to replication channel");
                None
            }
        }
    }

    /// Stops the replication listener tasks.
    pub fn shutdown(&self) {
        if let Some(broker) = &self.broker {
            broker.stop();
        }
    }
}
