//! Sequence CRDT implementation module.
//!
//! This module contains the replicated-growable-array engine and all its
//! supporting types: element identity, the element store, and the operation
//! wire format.

pub mod element;
pub mod op;
pub mod rga;
pub mod store;
pub mod types;

pub use element::Element;
pub use op::Operation;
pub use rga::{Rga, SerializedState};
pub use store::ElementStore;
pub use types::{ElementId, SiteClock, SiteId, generate_site_id};
