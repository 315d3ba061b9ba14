//! Whole-document edit translation.
//!
//! Clients push the full text they want the document to become. This module
//! diffs that text against the engine's current value and drives the engine
//! through a minimal, index-stable list of per-character operations: deletions
//! first, in reverse index order, then insertions left to right. That ordering
//! keeps every index valid while the script runs, so the operations replicate
//! cleanly to sites applying them against the same base.

use similar::{Algorithm, DiffOp, capture_diff_slices};

use crate::crdt::{Operation, Rga};
use crate::error::Result;

/// A partitioned edit script over the server text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditScript {
    /// Half-open `[start, end)` ranges to delete, sorted by start descending.
    pub deletions: Vec<(usize, usize)>,
    /// `(index, text)` insertions against the pre-insertion server text,
    /// sorted by index ascending.
    pub insertions: Vec<(usize, String)>,
}

impl EditScript {
    /// Returns true when the script changes nothing.
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.insertions.is_empty()
    }
}

/// Computes the edit script turning `server_text` into `desired_text`.
///
/// The diff runs per character with the Myers algorithm and no junk
/// heuristics, so the same pair of texts always yields the same script. A
/// replace contributes a deletion of the server range and an insertion of the
/// client slice at the same index.
pub fn edit_script(server_text: &str, desired_text: &str) -> EditScript {
    let server: Vec<char> = server_text.chars().collect();
    let desired: Vec<char> = desired_text.chars().collect();

    let mut deletions = Vec::new();
    let mut insertions = Vec::new();

    for op in capture_diff_slices(Algorithm::Myers, &server, &desired) {
        match op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index, old_len, ..
            } => {
                deletions.push((old_index, old_index + old_len));
            }
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => {
                let text: String = desired[new_index..new_index + new_len].iter().collect();
                insertions.push((old_index, text));
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                deletions.push((old_index, old_index + old_len));
                let text: String = desired[new_index..new_index + new_len].iter().collect();
                insertions.push((old_index, text));
            }
        }
    }

    deletions.sort_by(|a, b| b.0.cmp(&a.0));
    insertions.sort_by_key(|(index, _)| *index);

    EditScript {
        deletions,
        insertions,
    }
}

/// Diffs the engine's value against `desired_text` and applies the resulting
/// script, returning the operations to replicate.
///
/// Insertion indices from the script refer to the original server text; by
/// application time the document has already contracted by the deletions and
/// grown by earlier insertions, so each insertion point is shifted by the net
/// change before it. Deletions that resolve to noops (already-gone
/// characters) are not emitted. If an insertion still lands out of range the
/// translation aborts mid-script with the engine partially updated; the
/// caller is expected to resynchronise listeners with a full state update.
pub fn apply_text_change(engine: &mut Rga, desired_text: &str) -> Result<Vec<Operation>> {
    let server_text = engine.value();
    if server_text == desired_text {
        return Ok(Vec::new());
    }

    let script = edit_script(&server_text, desired_text);
    let mut ops = Vec::with_capacity(script.deletions.len() + script.insertions.len());

    for (start, end) in &script.deletions {
        for index in (*start..*end).rev() {
            let op = engine.local_delete(index);
            if !op.is_noop() {
                ops.push(op);
            }
        }
    }

    let mut inserted_before = 0usize;
    for (index, text) in &script.insertions {
        // Deleted ranges never straddle an insertion point, so every range
        // starting before it was removed entirely.
        let deleted_before: usize = script
            .deletions
            .iter()
            .filter(|(start, _)| start < index)
            .map(|(start, end)| end - start)
            .sum();
        let base = index - deleted_before + inserted_before;
        for (offset, ch) in text.chars().enumerate() {
            ops.push(engine.local_insert(base + offset, ch)?);
        }
        inserted_before += text.chars().count();
    }

    Ok(ops)
}
