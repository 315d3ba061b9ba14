//! Core RGA CRDT implementation.
//!
//! This module contains the main Rga struct and its operations. The engine
//! owns the element store and the site clock, turns index-addressed local
//! edits into replicable operations, and integrates remote operations
//! idempotently so that every replica converges on the same document.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crdt::element::Element;
use crate::crdt::op::Operation;
use crate::crdt::store::ElementStore;
use crate::crdt::types::{ElementId, SiteClock, SiteId, generate_site_id};
use crate::error::{Error, Result};

/// The replicated growable array engine for one document replica.
///
/// # Design
///
/// - Elements reference the element they were inserted after; the document
///   order is a depth-first traversal of those links starting at the head
///   sentinel, ranking concurrent siblings by descending id.
/// - Deletion is a tombstone flag; tombstones stay in the store forever so
///   concurrent insertions anchored on them keep resolving.
/// - Ids come from a per-site monotonic clock that also advances past every
///   remote clock it sees, so later local edits outrank everything already
///   integrated.
pub struct Rga {
    site_id: SiteId,
    store: ElementStore,
    clock: SiteClock,
}

/// Full engine state in its wire shape: the site id plus every element,
/// keyed by the JSON encoding of the `[clock, site]` id array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedState {
    #[serde(default = "generate_site_id")]
    pub site_id: SiteId,
    pub elements_by_id: BTreeMap<String, Element>,
}

impl Rga {
    /// Creates an empty document replica for the given site.
    pub fn new(site_id: impl Into<SiteId>) -> Self {
        Rga {
            site_id: site_id.into(),
            store: ElementStore::new(),
            clock: SiteClock::new(),
        }
    }

    /// Creates a replica with a freshly generated site id.
    pub fn with_generated_site() -> Self {
        Rga::new(generate_site_id())
    }

    /// The site id of this replica.
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// The most recent clock value used or observed (for tests and logs).
    pub fn last_clock(&self) -> i64 {
        self.clock.last()
    }

    /// Total number of stored elements, head and tombstones included.
    pub fn element_count(&self) -> usize {
        self.store.len()
    }

    /// The ordered visible elements, excluding the head and tombstones.
    pub fn visible_elements(&self) -> Vec<Element> {
        self.visible().into_iter().cloned().collect()
    }

    /// The current document text.
    pub fn value(&self) -> String {
        self.visible().into_iter().filter_map(|e| e.value).collect()
    }

    /// Number of visible characters.
    pub fn visible_len(&self) -> usize {
        self.visible().len()
    }

    /// Orders the stored elements by walking predecessor links from the head.
    ///
    /// Children sharing a predecessor are ranked by descending id: of two
    /// concurrent insertions at the same spot, the one with the greater id
    /// sits closer to the shared predecessor, which is what makes the
    /// traversal independent of integration order. Elements whose predecessor
    /// has not arrived yet hang off an unknown id and are simply never
    /// reached.
    fn visible(&self) -> Vec<&Element> {
        let mut children: HashMap<&ElementId, Vec<&Element>> = HashMap::new();
        for element in self.store.iter() {
            if let Some(pred) = &element.predecessor_id {
                children.entry(pred).or_default().push(element);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| b.id.cmp(&a.id));
        }

        let mut ordered: Vec<&Element> = Vec::with_capacity(self.store.len());
        let mut visited: HashSet<&ElementId> = HashSet::with_capacity(self.store.len());
        let mut stack: Vec<&Element> = Vec::new();
        if let Some(head) = self.store.get(&ElementId::head()) {
            stack.push(head);
        }

        while let Some(current) = stack.pop() {
            if !visited.insert(&current.id) {
                warn!(id = %current.id, "element revisited during traversal, skipping");
                continue;
            }
            ordered.push(current);
            if let Some(siblings) = children.get(&current.id) {
                // Reversed so the greatest sibling ends up on top of the stack.
                for &child in siblings.iter().rev() {
                    if !visited.contains(&child.id) {
                        stack.push(child);
                    }
                }
            }
        }

        ordered.into_iter().filter(|e| e.is_visible()).collect()
    }

    /// Mints a fresh element id, bumping the clock once more on the
    /// theoretically impossible collision with a stored id.
    fn mint_id(&mut self) -> Result<ElementId> {
        let id = ElementId::new(self.clock.tick(), self.site_id.clone());
        if !self.store.contains(&id) {
            return Ok(id);
        }
        warn!(%id, "element id collision, bumping clock");
        let retry = ElementId::new(self.clock.tick(), self.site_id.clone());
        if !self.store.contains(&retry) {
            return Ok(retry);
        }
        Err(Error::ClockStuck {
            site: self.site_id.clone(),
        })
    }

    /// Inserts a character at a visible index and returns the operation to
    /// replicate.
    ///
    /// Index 0 anchors on the head sentinel; an index equal to the current
    /// length appends after the last visible element; anything beyond that is
    /// an error.
    pub fn local_insert(&mut self, index: usize, value: char) -> Result<Operation> {
        let predecessor_id = {
            let visible = self.visible();
            if index > visible.len() {
                return Err(Error::IndexOutOfBounds {
                    index,
                    len: visible.len(),
                });
            }
            if index == 0 {
                ElementId::head()
            } else {
                visible[index - 1].id.clone()
            }
        };

        let id = self.mint_id()?;
        let element = Element::new(id, value, predecessor_id);
        let op = Operation::Insert {
            element: element.clone(),
        };
        self.store.put(element);
        Ok(op)
    }

    /// Tombstones the element at a visible index and returns the operation
    /// to replicate. An index past the end resolves to a noop rather than an
    /// error; the caller decides whether a noop is worth reporting.
    pub fn local_delete(&mut self, index: usize) -> Operation {
        let target = {
            let visible = self.visible();
            if index >= visible.len() {
                return Operation::Noop {
                    reason: format!("delete index {index} out of bounds"),
                };
            }
            visible[index].id.clone()
        };

        self.store.mark_tombstone(&target);
        Operation::Delete { element_id: target }
    }

    /// Integrates an operation from another replica.
    ///
    /// Integration is idempotent and commutative: applying the same operation
    /// twice, or two causally-ready operations in either order, leaves the
    /// same state. Invalid input is logged and dropped, never raised; a bad
    /// peer must not take the document down.
    pub fn apply_remote(&mut self, operation: Operation) {
        match operation {
            Operation::Insert { element } => self.integrate_insert(element),
            Operation::Delete { element_id } => self.integrate_delete(element_id),
            Operation::Noop { .. } => {}
        }
    }

    fn integrate_insert(&mut self, element: Element) {
        if element.id.is_head() {
            warn!("dropping remote insert that names the head sentinel");
            return;
        }
        self.clock.observe(element.id.clock);

        if let Some(existing) = self.store.get(&element.id) {
            // Duplicate id: merge only the tombstone flag, delete-wins. The
            // stored identity fields never change, and a tombstone never
            // comes back.
            if element.is_tombstone && !existing.is_tombstone {
                self.store.mark_tombstone(&element.id);
            }
            return;
        }

        let Some(pred) = &element.predecessor_id else {
            warn!(id = %element.id, "dropping remote insert without a predecessor");
            return;
        };
        if !self.store.contains(pred) {
            // Out-of-order delivery: keep the element, it stays invisible
            // until its predecessor arrives.
            warn!(id = %element.id, predecessor = %pred, "predecessor not integrated yet");
        }
        self.store.put(element);
    }

    fn integrate_delete(&mut self, element_id: ElementId) {
        if element_id.is_head() {
            warn!("ignoring remote delete of the head sentinel");
            return;
        }
        self.clock.observe(element_id.clock);

        if self.store.contains(&element_id) {
            self.store.mark_tombstone(&element_id);
        }
        // Unknown ids are dropped; the insert may still be in flight and the
        // deleting site will have tombstoned the element in its own copy.
    }

    /// Exports the full state, tombstones and causal links included.
    pub fn serialize_state(&self) -> SerializedState {
        let elements_by_id = self
            .store
            .iter()
            .map(|e| {
                let key = serde_json::to_string(&e.id).expect("element id encodes as JSON");
                (key, e.clone())
            })
            .collect();
        SerializedState {
            site_id: self.site_id.clone(),
            elements_by_id,
        }
    }

    /// Rebuilds an engine from exported state.
    ///
    /// Corrupt id keys are skipped with a warning, a missing head sentinel is
    /// restored with a warning, and the clock resumes past the highest clock
    /// value present so future local ids stay unique.
    pub fn deserialize_state(state: SerializedState) -> Rga {
        let mut elements: HashMap<ElementId, Element> = HashMap::new();
        for (key, element) in state.elements_by_id {
            match serde_json::from_str::<ElementId>(&key) {
                Ok(id) => {
                    elements.insert(id, element);
                }
                Err(e) => warn!(key = %key, error = %e, "skipping element with unparseable id key"),
            }
        }
        if !elements.contains_key(&ElementId::head()) {
            warn!(site = %state.site_id, "head sentinel missing from serialized state, restoring");
            elements.insert(ElementId::head(), Element::head());
        }

        let last_clock = elements.keys().map(|id| id.clock).max().unwrap_or(0);
        let mut store = ElementStore::new();
        store
            .replace_all(elements)
            .expect("head sentinel is present after restoration");

        Rga {
            site_id: state.site_id,
            store,
            clock: SiteClock::resume_from(last_clock),
        }
    }
}
