//! Sessions, participants, and presence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::ParticipantId;
use crate::document::DocumentId;

/// Unique identifier for a session
pub type SessionId = String;

/// What members of a session are allowed to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPermissions {
    pub can_edit: bool,
    pub can_comment: bool,
    pub can_share: bool,
    pub can_export: bool,
}

impl SessionPermissions {
    pub fn full() -> Self {
        Self {
            can_edit: true,
            can_comment: true,
            can_share: true,
            can_export: true,
        }
    }

    pub fn read_only() -> Self {
        Self {
            can_edit: false,
            can_comment: false,
            can_share: false,
            can_export: true,
        }
    }
}

/// A caret location reported by an editor. `line`/`column` are whatever the
/// reporting origin uses; `offset` is an optional flat character offset. The
/// core relays cursor values, it does not interpret them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
    pub offset: Option<usize>,
}

/// One collaborator in a session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub online: bool,
    pub last_active: DateTime<Utc>,
    pub cursor: Option<CursorPosition>,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            online: true,
            last_active: Utc::now(),
            cursor: None,
        }
    }
}

/// The runtime binding between one document and its collaborators.
///
/// A Session and its Document are created and destroyed together; participants
/// are added on join and marked offline (not removed) on leave.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub document_id: DocumentId,
    pub owner: ParticipantId,
    pub participants: Vec<Participant>,
    pub permissions: SessionPermissions,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a session owned by `owner`, with full permissions and the owner
    /// as its first participant
    pub fn new(document_id: impl Into<DocumentId>, owner: Participant) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.into(),
            owner: owner.id.clone(),
            participants: vec![owner],
            permissions: SessionPermissions::full(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn participant(&self, participant_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    pub fn participant_mut(&mut self, participant_id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == participant_id)
    }

    /// Insert a participant, replacing any existing entry with the same id
    /// while keeping its position in the member order
    pub fn upsert_participant(&mut self, participant: Participant) {
        match self.participant_mut(&participant.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
        self.updated_at = Utc::now();
    }
}
