//! Site identifier type and related functionality.
//!
//! This module contains the definition of SiteId, which uniquely identifies
//! each replica participating in the collaborative document.

/// A stable, opaque identifier for a replica (site) in the distributed system.
///
/// Every participant in the collaborative editing system carries a unique site
/// id. It breaks ties between element ids generated with the same clock value,
/// so two sites must never share one.
pub type SiteId = String;

/// Generates a fresh random site id for a replica that was not configured
/// with one.
pub fn generate_site_id() -> SiteId {
    uuid::Uuid::new_v4().to_string()
}
