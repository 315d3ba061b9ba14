//! Redis pub/sub replication transport.
//!
//! Each document has one logical channel; every message on it is the UTF-8
//! JSON of a single operation. The broker owns a multiplexed connection for
//! publishing and spawns one listener task per subscription, forwarding
//! parsed operations to the coordinator. Transport failure is never fatal to
//! the local editing path.

use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::crdt::Operation;

/// Connection to the replication fabric.
pub struct RedisBroker {
    client: redis::Client,
    publish_conn: MultiplexedConnection,
    shutdown_tx: watch::Sender<bool>,
}

impl RedisBroker {
    /// Connects and pings the server so a dead transport is detected at
    /// startup rather than on the first publish.
    pub async fn connect(host: &str, port: u16) -> redis::RedisResult<Self> {
        let client = redis::Client::open(format!("redis://{host}:{port}/"))?;
        let mut publish_conn = client.get_multiplexed_tokio_connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut publish_conn)
            .await?;
        info!(host, port, "connected to redis");

        let (shutdown_tx, _) = watch::channel(false);
        Ok(RedisBroker {
            client,
            publish_conn,
            shutdown_tx,
        })
    }

    /// Publishes one operation on the channel. Failures are logged and
    /// swallowed: local edits must keep flowing to attached sessions even
    /// when the fabric is down.
    pub async fn publish(&self, channel: &str, operation: &Operation) {
        let payload = match serde_json::to_string(operation) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize operation for publish");
                return;
            }
        };
        let mut conn = self.publish_conn.clone();
        if let Err(e) = conn.publish::<_, _, ()>(channel, payload).await {
            warn!(channel, error = %e, "failed to publish operation");
        }
    }

    /// Subscribes to the channel and spawns a listener task that forwards
    /// each decodable operation. Malformed payloads are warned and dropped;
    /// the task exits when the broker is stopped, the connection dies, or the
    /// receiver is dropped.
    pub async fn subscribe(
        &self,
        channel: &str,
    ) -> redis::RedisResult<mpsc::UnboundedReceiver<Operation>> {
        let conn = self.client.get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        pubsub.subscribe(channel).await?;
        info!(channel, "subscribed to replication channel");

        let (tx, rx) = mpsc::unbounded_channel();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let channel = channel.to_string();

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            loop {
                tokio::select! {
                    maybe_msg = stream.next() => {
                        let Some(msg) = maybe_msg else {
                            warn!(channel = %channel, "replication stream closed");
                            break;
                        };
                        let payload: String = match msg.get_payload() {
                            Ok(payload) => payload,
                            Err(e) => {
                                warn!(channel = %channel, error = %e, "undecodable replication payload");
                                continue;
                            }
                        };
                        match serde_json::from_str::<Operation>(&payload) {
                            Ok(op) => {
                                if tx.send(op).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(channel = %channel, error = %e, payload = %payload, "dropping malformed operation");
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!(channel = %channel, "replication listener stopping");
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    /// Signals every listener task to finish its current message and exit.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
