//! Element definition for the replicated sequence.
//!
//! This module contains the Element struct which represents individual
//! characters in the document, plus the head sentinel every document starts
//! from.

use serde::{Deserialize, Serialize};

use crate::crdt::types::ElementId;

/// A single entry in the replicated sequence.
///
/// Each element records the character it carries, the element it was inserted
/// immediately after at its creation site, and a tombstone flag for logical
/// deletion.
///
/// # Immutability
///
/// Once an element exists, its `id`, `value` and `predecessor_id` never
/// change; only `is_tombstone` may flip, and only from false to true.
/// Tombstoned elements stay in the store so that concurrent elements anchored
/// on them keep a resolvable predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Unique identifier, also used to rank concurrent siblings
    pub id: ElementId,
    /// The character content; `None` only for the head sentinel
    pub value: Option<char>,
    /// The element this one was inserted after; `None` only for the head
    pub predecessor_id: Option<ElementId>,
    /// Whether this element has been logically deleted
    #[serde(default)]
    pub is_tombstone: bool,
}

impl Element {
    /// Creates a live element carrying one character.
    pub fn new(id: ElementId, value: char, predecessor_id: ElementId) -> Self {
        Element {
            id,
            value: Some(value),
            predecessor_id: Some(predecessor_id),
            is_tombstone: false,
        }
    }

    /// Creates the head sentinel.
    ///
    /// The head anchors every document: it carries no value, has no
    /// predecessor, and is never tombstoned.
    pub fn head() -> Self {
        Element {
            id: ElementId::head(),
            value: None,
            predecessor_id: None,
            is_tombstone: false,
        }
    }

    /// Returns true if this element is the head sentinel.
    pub fn is_head(&self) -> bool {
        self.id.is_head()
    }

    /// Returns true if this element contributes to the visible document.
    pub fn is_visible(&self) -> bool {
        !self.is_tombstone && !self.is_head()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_creation() {
        let elem = Element::new(ElementId::new(1, "a"), 'X', ElementId::head());

        assert_eq!(elem.value, Some('X'));
        assert_eq!(elem.predecessor_id, Some(ElementId::head()));
        assert!(!elem.is_tombstone);
        assert!(elem.is_visible());
    }

    #[test]
    fn test_head_is_not_visible() {
        let head = Element::head();

        assert!(head.is_head());
        assert!(!head.is_visible());
        assert_eq!(head.value, None);
        assert_eq!(head.predecessor_id, None);
    }

    #[test]
    fn test_tombstone_is_not_visible() {
        let mut elem = Element::new(ElementId::new(1, "a"), 'X', ElementId::head());
        elem.is_tombstone = true;

        assert!(!elem.is_visible());
    }

    #[test]
    fn test_wire_shape() {
        let elem = Element::new(ElementId::new(3, "s1"), 'q', ElementId::head());
        let json = serde_json::to_value(&elem).unwrap();

        assert_eq!(json["id"], serde_json::json!([3, "s1"]));
        assert_eq!(json["value"], serde_json::json!("q"));
        assert_eq!(json["predecessor_id"], serde_json::json!([-1, "START"]));
        assert_eq!(json["is_tombstone"], serde_json::json!(false));
    }

    #[test]
    fn test_tombstone_flag_defaults_to_false() {
        let elem: Element =
            serde_json::from_str(r#"{"id":[1,"a"],"value":"x","predecessor_id":[-1,"START"]}"#)
                .unwrap();

        assert!(!elem.is_tombstone);
    }
}
