//! Element identifier implementation for RGA elements.
//!
//! This module contains the ElementId struct which serves as a globally unique
//! identifier for each element in the document, providing both identity and a
//! total order used to rank concurrent siblings.

use serde::{Deserialize, Serialize};

use crate::crdt::types::site::SiteId;

/// Clock component of the reserved head sentinel id.
pub const HEAD_CLOCK: i64 = -1;
/// Site component of the reserved head sentinel id.
pub const HEAD_SITE: &str = "START";

/// A unique identifier for each element in the document.
///
/// An ElementId pairs the originating site's logical clock value with the site
/// id itself. The derived ordering compares the clock first and falls back to
/// the site id, which gives a total order across all replicas: no two sites
/// share an id, and ids minted later on one site always compare greater.
///
/// On the wire an id is the two-element JSON array `[clock, site]`, matching
/// the serialized document format.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(i64, SiteId)", into = "(i64, SiteId)")]
pub struct ElementId {
    /// Logical clock value at the originating site when the id was minted
    pub clock: i64,
    /// The id of the site that minted this identifier
    pub site: SiteId,
}

impl ElementId {
    /// Creates a new ElementId from a clock value and site id.
    pub fn new(clock: i64, site: impl Into<SiteId>) -> Self {
        ElementId {
            clock,
            site: site.into(),
        }
    }

    /// The reserved id of the head sentinel, `(-1, "START")`.
    ///
    /// It compares below every id a real site can mint, since site clocks
    /// start at zero.
    pub fn head() -> Self {
        ElementId::new(HEAD_CLOCK, HEAD_SITE)
    }

    /// Returns true if this id names the head sentinel.
    pub fn is_head(&self) -> bool {
        self.clock == HEAD_CLOCK && self.site == HEAD_SITE
    }
}

impl From<(i64, SiteId)> for ElementId {
    fn from((clock, site): (i64, SiteId)) -> Self {
        ElementId { clock, site }
    }
}

impl From<ElementId> for (i64, SiteId) {
    fn from(id: ElementId) -> Self {
        (id.clock, id.site)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.clock, self.site)
    }
}
