//! # rga-collab - collaborative plain-text editing backend
//!
//! A real-time collaborative editor core built on a Replicated Growable
//! Array (RGA) sequence CRDT, with an operation pipeline that turns
//! whole-document client edits into causally-ordered operations and a
//! replication fabric that fans them out to every participating site.
//!
//! ## Features
//!
//! - **Conflict-free**: concurrent operations apply in any order, any number
//!   of times, and every replica converges on the same text
//! - **Intent-preserving edits**: client text pushes are diffed into minimal
//!   per-character operation streams
//! - **Tombstone-based deletion**: deleted characters stay in the store so
//!   concurrent edits anchored on them keep resolving
//! - **Snapshots**: the full state, causal links included, can be captured
//!   and restored in place
//!
//! ## Example
//!
//! ```rust
//! use rga_collab::Rga;
//!
//! let mut site_a = Rga::new("site-a");
//! let mut site_b = Rga::new("site-b");
//!
//! let op = site_a.local_insert(0, 'H').unwrap();
//! site_b.apply_remote(op);
//!
//! assert_eq!(site_a.value(), site_b.value());
//! ```

pub mod broker;
pub mod config;
pub mod coordinator;
pub mod crdt;
pub mod error;
pub mod server;
pub mod translate;

pub use broker::RedisBroker;
pub use config::{Config, DOCUMENT_CHANNEL};
pub use coordinator::{Coordinator, SessionId};
pub use crdt::{Element, ElementId, Operation, Rga, SerializedState, SiteId};
pub use error::{Error, Result};
pub use server::{AppState, ClientEvent, ServerEvent, create_router};
