//! Operation wire format.
//!
//! Operations are what replicas exchange: a full element for an insert, the
//! target id for a delete. They are serialised as tagged JSON, one operation
//! per replication message.

use serde::{Deserialize, Serialize};

use crate::crdt::element::Element;
use crate::crdt::types::ElementId;

/// A single replicated edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// A new element, carried whole so receivers can integrate it without
    /// further lookups.
    Insert { element: Element },
    /// Tombstone the element with this id.
    Delete { element_id: ElementId },
    /// A local edit that resolved to nothing; never replicated.
    Noop { reason: String },
}

impl Operation {
    /// The site that produced this operation, used by the self-origination
    /// filter on the replication channel. Noops carry no origin.
    pub fn origin_site(&self) -> Option<&str> {
        match self {
            Operation::Insert { element } => Some(&element.id.site),
            Operation::Delete { element_id } => Some(&element_id.site),
            Operation::Noop { .. } => None,
        }
    }

    /// Returns true for operations that mutate no state.
    pub fn is_noop(&self) -> bool {
        matches!(self, Operation::Noop { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_wire_format() {
        let op = Operation::Insert {
            element: Element::new(ElementId::new(2, "site-a"), 'H', ElementId::head()),
        };
        let json = serde_json::to_value(&op).unwrap();

        assert_eq!(json["type"], "insert");
        assert_eq!(json["element"]["id"], serde_json::json!([2, "site-a"]));
        assert_eq!(json["element"]["value"], "H");
    }

    #[test]
    fn test_delete_wire_format() {
        let op = Operation::Delete {
            element_id: ElementId::new(2, "site-a"),
        };
        let json = serde_json::to_value(&op).unwrap();

        assert_eq!(json["type"], "delete");
        assert_eq!(json["element_id"], serde_json::json!([2, "site-a"]));
    }

    #[test]
    fn test_origin_site() {
        let insert = Operation::Insert {
            element: Element::new(ElementId::new(2, "site-a"), 'H', ElementId::head()),
        };
        let delete = Operation::Delete {
            element_id: ElementId::new(9, "site-b"),
        };
        let noop = Operation::Noop {
            reason: "out of range".into(),
        };

        assert_eq!(insert.origin_site(), Some("site-a"));
        assert_eq!(delete.origin_site(), Some("site-b"));
        assert_eq!(noop.origin_site(), None);
    }

    #[test]
    fn test_round_trip() {
        let op = Operation::Delete {
            element_id: ElementId::new(5, "s"),
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();

        assert_eq!(back, op);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = serde_json::from_str::<Operation>(r#"{"type":"upsert","element_id":[1,"a"]}"#);
        assert!(result.is_err());
    }
}
