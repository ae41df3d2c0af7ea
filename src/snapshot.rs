//! Snapshot codec for persistence and resume
//!
//! A snapshot is a self-contained JSON rendering of one session and its
//! document, sufficient to reconstruct equivalent state later. Vector clocks
//! serialize as ordered (participant, count) pair lists throughout.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::session::Session;

/// Everything needed to restore one session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: Session,
    pub document: Document,
}

impl SessionSnapshot {
    /// Serialize to a JSON string. Failures are logged and reported as `None`
    /// since callers treat a missing snapshot as "nothing to persist".
    pub fn encode(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::warn!("failed to encode snapshot for session {}: {}", self.session.id, e);
                None
            }
        }
    }

    /// Parse a snapshot, returning `None` on any parse or shape failure.
    ///
    /// A document whose version disagrees with its log length is a shape
    /// failure: the restore path is a trust boundary for the core invariant.
    pub fn decode(raw: &str) -> Option<Self> {
        let snapshot: SessionSnapshot = match serde_json::from_str(raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("failed to decode session snapshot: {}", e);
                return None;
            }
        };
        if !snapshot.document.is_consistent() {
            log::warn!(
                "rejecting snapshot for session {}: version {} does not match log length {}",
                snapshot.session.id,
                snapshot.document.version(),
                snapshot.document.operations().len()
            );
            return None;
        }
        Some(snapshot)
    }
}
