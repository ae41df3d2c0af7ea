//! Edit operations and their causal metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{ParticipantId, VectorClock};

/// Unique identifier for an operation
pub type OpId = Uuid;

/// The two primitive edits on document content.
///
/// Positions are character offsets into the content at apply time, not byte
/// offsets; the document engine clamps them to the current bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edit {
    /// Splice `text` into the content at `position`
    Insert { position: usize, text: String },

    /// Remove the half-open character range `[position, position + length)`
    Delete { position: usize, length: usize },
}

impl Edit {
    /// The character offset this edit addresses
    pub fn position(&self) -> usize {
        match self {
            Edit::Insert { position, .. } => *position,
            Edit::Delete { position, .. } => *position,
        }
    }
}

/// An edit wrapped with the metadata needed for transmission and replay.
///
/// The clock field is the authoring replica's vector clock snapshot taken at
/// creation time, before the operation is merged into any document clock.
/// Operations are immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    /// Unique ID for this operation
    pub id: OpId,

    /// Which participant authored this operation
    pub origin: ParticipantId,

    /// Wall-clock creation time
    pub timestamp: DateTime<Utc>,

    /// What the author had incorporated when they created this operation
    pub clock: VectorClock,

    /// The actual edit
    pub edit: Edit,
}

impl Operation {
    /// Create a new operation envelope
    pub fn new(origin: ParticipantId, clock: VectorClock, edit: Edit) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin,
            timestamp: Utc::now(),
            clock,
            edit,
        }
    }

    /// Create an insert operation
    pub fn insert(
        origin: impl Into<ParticipantId>,
        clock: VectorClock,
        position: usize,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            origin.into(),
            clock,
            Edit::Insert {
                position,
                text: text.into(),
            },
        )
    }

    /// Create a delete operation
    pub fn delete(
        origin: impl Into<ParticipantId>,
        clock: VectorClock,
        position: usize,
        length: usize,
    ) -> Self {
        Self::new(origin.into(), clock, Edit::Delete { position, length })
    }
}
