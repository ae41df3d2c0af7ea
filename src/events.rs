//! Per-session event fan-out
//!
//! Subscribers see content, cursor, and participant changes for one session.
//! Delivery is synchronous and in registration order; a panicking listener is
//! isolated so the rest still receive the event. A broadcast channel carries
//! the same events to async consumers.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::clock::ParticipantId;
use crate::op::Operation;
use crate::session::{CursorPosition, Participant};

/// What kind of change an event describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Content,
    Cursor,
    Participant,
}

/// Membership transitions reported by participant events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantAction {
    Joined,
    Left,
}

/// The change itself, one variant per event kind
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventPayload {
    Content(Operation),
    Cursor(CursorPosition),
    Participant {
        action: ParticipantAction,
        participant: Participant,
    },
}

/// One change notification delivered to session subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub participant_id: ParticipantId,
    pub timestamp: DateTime<Utc>,
    pub data: EventPayload,
}

impl SessionEvent {
    pub fn content(participant_id: ParticipantId, op: Operation) -> Self {
        Self {
            kind: EventKind::Content,
            participant_id,
            timestamp: Utc::now(),
            data: EventPayload::Content(op),
        }
    }

    pub fn cursor(participant_id: ParticipantId, cursor: CursorPosition) -> Self {
        Self {
            kind: EventKind::Cursor,
            participant_id,
            timestamp: Utc::now(),
            data: EventPayload::Cursor(cursor),
        }
    }

    pub fn participant(action: ParticipantAction, participant: Participant) -> Self {
        Self {
            kind: EventKind::Participant,
            participant_id: participant.id.clone(),
            timestamp: Utc::now(),
            data: EventPayload::Participant {
                action,
                participant,
            },
        }
    }
}

/// A registered synchronous callback
pub type Listener = Box<dyn Fn(&SessionEvent) + Send + Sync>;

const BROADCAST_CAPACITY: usize = 32;

/// The listeners registered for one session, plus the broadcast side-channel
pub struct ListenerSet {
    listeners: Vec<(Uuid, Listener)>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl ListenerSet {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            listeners: Vec::new(),
            broadcast_tx,
        }
    }

    /// Register a callback; the returned id removes exactly that callback
    pub fn add(&mut self, listener: Listener) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: Uuid) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    /// A receiver for async consumers of this session's events
    pub fn stream(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Deliver an event to every listener in registration order. Each call is
    /// isolated: one listener panicking must not starve the ones after it.
    pub fn emit(&self, event: &SessionEvent) {
        let _ = self.broadcast_tx.send(event.clone());
        for (id, listener) in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                log::warn!("session listener {} panicked; continuing delivery", id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}
