//! Error types for the collaborative editor backend.
//!
//! Typed errors are reserved for programming-contract violations on the local
//! path. Failures caused by remote input (malformed operations, unknown ids)
//! are logged and dropped where they occur, never raised, so one bad peer
//! cannot crash the server.

use thiserror::Error;

/// Errors surfaced by the engine and the snapshot subsystem.
#[derive(Debug, Error)]
pub enum Error {
    /// An index-addressed edit fell outside the visible document.
    #[error("index {index} out of bounds for document length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Freshly minted element ids kept colliding with stored ones, which
    /// means the site clock is no longer advancing.
    #[error("persistent element id collision for site {site}")]
    ClockStuck { site: String },

    /// A state load was refused because the input lacks the head sentinel.
    #[error("state is missing the head sentinel")]
    MissingHead,

    /// A revert named a snapshot that does not exist.
    #[error("snapshot {0} not found")]
    UnknownSnapshot(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
