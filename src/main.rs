//! Collaborative editor server binary.
//!
//! Wires the engine, the replication broker, and the coordination hub
//! together and serves the HTTP/WebSocket surface until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rga_collab::broker::RedisBroker;
use rga_collab::config::{Config, DOCUMENT_CHANNEL};
use rga_collab::coordinator::Coordinator;
use rga_collab::crdt::Rga;
use rga_collab::server::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    info!(?config, "starting collaborative editor server");

    let broker = match RedisBroker::connect(&config.redis_host, config.redis_port).await {
        Ok(broker) => Some(broker),
        Err(e) => {
            warn!(error = %e, "redis unavailable, real-time replication disabled");
            None
        }
    };

    let engine = Rga::new(config.site_id.clone());
    let hub = Arc::new(Coordinator::new(engine, broker, DOCUMENT_CHANNEL));

    if let Some(mut inbound) = hub.subscribe_replication().await {
        let inbound_hub = hub.clone();
        tokio::spawn(async move {
            while let Some(op) = inbound.recv().await {
                inbound_hub.on_inbound_from_channel(op).await;
            }
        });
    }

    let app = create_router().with_state(hub.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    hub.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install shutdown handler");
    }
}
