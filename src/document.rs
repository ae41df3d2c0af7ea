//! The document engine
//!
//! A Document owns one shared text's content, version counter, vector clock,
//! and append-only operation log. Applying an operation is the single point
//! that mutates any of them, which keeps the core invariant trivially true:
//! `version == operations.len()` and clock entries never decrease.

use serde::{Deserialize, Serialize};

use crate::clock::VectorClock;
use crate::op::{Edit, OpId, Operation};

/// Unique identifier for a document
pub type DocumentId = String;

/// One collaboratively edited text document.
///
/// Fields are private so content can only change by applying an operation;
/// out-of-range positions are clamped rather than allowed to corrupt state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    content: String,
    version: u64,
    vector_clock: VectorClock,
    operations: Vec<Operation>,
}

impl Document {
    /// Create a fresh document at version 0 with an empty clock and log
    pub fn new(id: impl Into<DocumentId>, initial_content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: initial_content.into(),
            version: 0,
            vector_clock: VectorClock::new(),
            operations: Vec::new(),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn vector_clock(&self) -> &VectorClock {
        &self.vector_clock
    }

    /// The append-only log of applied operations, in apply order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether an operation with this id has already been applied
    pub fn contains_op(&self, op_id: &OpId) -> bool {
        self.operations.iter().any(|op| op.id == *op_id)
    }

    /// `version` must always equal the log length; checked when restoring
    /// a document from an untrusted snapshot.
    pub fn is_consistent(&self) -> bool {
        self.version == self.operations.len() as u64
    }

    /// Apply an operation: splice content, bump the version, fold the
    /// operation's clock into the document clock, and append to the log.
    ///
    /// Positions and lengths are character offsets and are clamped to the
    /// current content bounds, so racing operations from other origins can
    /// never push the document into an invalid state.
    pub fn apply(&mut self, op: Operation) {
        match &op.edit {
            Edit::Insert { position, text } => {
                let at = byte_offset(&self.content, *position);
                self.content.insert_str(at, text);
            }
            Edit::Delete { position, length } => {
                let start = byte_offset(&self.content, *position);
                let end = byte_offset(&self.content, position.saturating_add(*length));
                self.content.drain(start..end);
            }
        }
        self.version += 1;
        self.vector_clock.merge(&op.clock);
        self.operations.push(op);
    }
}

/// Byte index of the `char_pos`-th character, clamped to the content length
fn byte_offset(content: &str, char_pos: usize) -> usize {
    content
        .char_indices()
        .nth(char_pos)
        .map(|(idx, _)| idx)
        .unwrap_or(content.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VectorClock;

    fn clock_at(participant: &str, count: u64) -> VectorClock {
        let mut clock = VectorClock::new();
        clock.observe(participant, count);
        clock
    }

    #[test]
    fn test_insert_and_delete() {
        let mut doc = Document::new("doc_1", "Hello");

        doc.apply(Operation::insert("A", clock_at("A", 1), 5, " World"));
        assert_eq!(doc.content(), "Hello World");
        assert_eq!(doc.version(), 1);

        doc.apply(Operation::delete("A", clock_at("A", 2), 0, 6));
        assert_eq!(doc.content(), "World");
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_version_tracks_log_length() {
        let mut doc = Document::new("doc_1", "");
        for i in 0..5 {
            doc.apply(Operation::insert("A", clock_at("A", i + 1), 0, "x"));
            assert_eq!(doc.version(), doc.operations().len() as u64);
        }
        assert!(doc.is_consistent());
    }

    #[test]
    fn test_clock_folds_by_maximum() {
        let mut doc = Document::new("doc_1", "");

        doc.apply(Operation::insert("A", clock_at("A", 1), 0, "a"));
        let mut remote = clock_at("A", 1);
        remote.observe("B", 1);
        doc.apply(Operation::insert("B", remote, 1, "b"));

        assert_eq!(doc.vector_clock().get("A"), 1);
        assert_eq!(doc.vector_clock().get("B"), 1);
    }

    #[test]
    fn test_out_of_range_insert_clamps_to_end() {
        let mut doc = Document::new("doc_1", "ab");
        doc.apply(Operation::insert("A", clock_at("A", 1), 99, "c"));
        assert_eq!(doc.content(), "abc");
    }

    #[test]
    fn test_out_of_range_delete_clamps() {
        let mut doc = Document::new("doc_1", "abcd");
        doc.apply(Operation::delete("A", clock_at("A", 1), 2, 99));
        assert_eq!(doc.content(), "ab");

        doc.apply(Operation::delete("A", clock_at("A", 2), 99, 1));
        assert_eq!(doc.content(), "ab");
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_positions_are_character_offsets() {
        let mut doc = Document::new("doc_1", "héllo");
        doc.apply(Operation::insert("A", clock_at("A", 1), 2, "X"));
        assert_eq!(doc.content(), "héXllo");

        doc.apply(Operation::delete("A", clock_at("A", 2), 1, 2));
        assert_eq!(doc.content(), "hllo");
    }

    #[test]
    fn test_insert_then_inverse_delete_restores_content() {
        let mut doc = Document::new("doc_1", "Hello");
        doc.apply(Operation::insert("A", clock_at("A", 1), 5, " World"));
        doc.apply(Operation::delete("A", clock_at("A", 2), 5, 6));

        // Content cancels out but both operations stay in the log
        assert_eq!(doc.content(), "Hello");
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.operations().len(), 2);
    }
}
