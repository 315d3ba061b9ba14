//! Environment-driven configuration.
//!
//! Every setting has a default suitable for local development, so the server
//! starts with no environment at all.

use std::env;

use tracing::warn;

/// The single document channel of the MVP.
pub const DOCUMENT_CHANNEL: &str = "doc1";

/// Server configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis host for the replication fabric (`REDIS_HOST`).
    pub redis_host: String,
    /// Redis port (`REDIS_PORT`).
    pub redis_port: u16,
    /// HTTP/WebSocket bind address (`BIND_ADDR`).
    pub bind_addr: String,
    /// This replica's site id (`SITE_ID`).
    pub site_id: String,
}

impl Config {
    /// Reads configuration from the environment, warning about and replacing
    /// unparseable values with their defaults.
    pub fn from_env() -> Self {
        let redis_host = env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
        let redis_port = env::var("REDIS_PORT")
            .ok()
            .and_then(|raw| match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!(value = %raw, "invalid REDIS_PORT, falling back to 6379");
                    None
                }
            })
            .unwrap_or(6379);
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let site_id = env::var("SITE_ID").unwrap_or_else(|_| "server".to_string());

        Config {
            redis_host,
            redis_port,
            bind_addr,
            site_id,
        }
    }
}
