//! Element storage for the replicated sequence.
//!
//! The store owns every element the document has ever seen, keyed by id:
//! the head sentinel, live characters, and tombstones. Sequence order is not
//! a store concern; it is derived from predecessor links by the engine.

use std::collections::HashMap;

use tracing::warn;

use crate::crdt::element::Element;
use crate::crdt::types::ElementId;
use crate::error::{Error, Result};

/// Map from element id to element, always containing the head sentinel.
///
/// Elements are never removed: deletion is a tombstone flag so that
/// concurrent edits anchored on a deleted element keep a resolvable
/// predecessor.
#[derive(Debug)]
pub struct ElementStore {
    elements: HashMap<ElementId, Element>,
}

impl ElementStore {
    /// Creates a store holding only the head sentinel.
    pub fn new() -> Self {
        let mut elements = HashMap::new();
        elements.insert(ElementId::head(), Element::head());
        ElementStore { elements }
    }

    /// Inserts an element. Existing entries are not overwritten; duplicate
    /// handling is the engine's integration rule, which merges the tombstone
    /// flag before ever calling this.
    pub fn put(&mut self, element: Element) {
        self.elements.entry(element.id.clone()).or_insert(element);
    }

    /// Point lookup.
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Returns true if the id is present.
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Marks the element as deleted. Idempotent; unknown ids are logged and
    /// ignored, and the head sentinel is never tombstoned.
    pub fn mark_tombstone(&mut self, id: &ElementId) {
        if id.is_head() {
            warn!("refusing to tombstone the head sentinel");
            return;
        }
        match self.elements.get_mut(id) {
            Some(element) => element.is_tombstone = true,
            None => warn!(%id, "cannot tombstone unknown element"),
        }
    }

    /// Iterates over all elements including the head and tombstones, in no
    /// particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Total number of stored elements, head and tombstones included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the store holds nothing but could not: the head is
    /// always present, so this is always false for a valid store.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Atomically replaces the whole element map. Input lacking the head
    /// sentinel is refused, leaving the current state untouched.
    pub fn replace_all(&mut self, elements: HashMap<ElementId, Element>) -> Result<()> {
        if !elements.contains_key(&ElementId::head()) {
            return Err(Error::MissingHead);
        }
        self.elements = elements;
        Ok(())
    }
}

impl Default for ElementStore {
    fn default() -> Self {
        Self::new()
    }
}
