//! The session registry and synchronization entry points
//!
//! A SessionManager is an explicit store object: it owns every session and
//! document it has created, and the component composing this core decides how
//! many managers exist. Nothing here is a process-wide singleton.
//!
//! Each session's state lives behind its own mutex, so applies to one
//! document are serialized while independent documents proceed in parallel.
//! Synchronous listeners run while that mutex is held; a listener must not
//! call back into the manager for its own session (use `event_stream` for
//! re-entrant consumers).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::clock::ParticipantId;
use crate::document::{Document, DocumentId};
use crate::error::SyncError;
use crate::events::{ListenerSet, ParticipantAction, SessionEvent};
use crate::gate::{self, Admission, CausalGate};
use crate::op::{Edit, Operation};
use crate::session::{CursorPosition, Participant, Session, SessionId, SessionPermissions};
use crate::snapshot::SessionSnapshot;

/// Everything owned by one live session
struct SessionState {
    session: Session,
    document: Document,
    gate: CausalGate,
    listeners: ListenerSet,
}

impl SessionState {
    /// Apply an operation to the document and notify subscribers
    fn apply_and_notify(&mut self, op: Operation) {
        let origin = op.origin.clone();
        self.document.apply(op.clone());
        self.listeners.emit(&SessionEvent::content(origin, op));
    }

    /// Re-offer parked operations until none are admissible. One arriving
    /// operation can release a chain of parked ones.
    fn drain_backlog(&mut self) {
        while let Some(op) = self.gate.take_admissible(self.document.vector_clock()) {
            self.apply_and_notify(op);
        }
    }
}

/// Handle for one registered listener; `cancel` removes exactly that
/// callback and leaves every other listener untouched
pub struct Subscription {
    state: Weak<Mutex<SessionState>>,
    id: Uuid,
}

impl Subscription {
    pub fn cancel(self) {
        if let Some(state) = self.state.upgrade() {
            lock_state(&state).listeners.remove(self.id);
        }
    }
}

/// The collaborative-editing core: session lifecycle, local and remote
/// applies, presence, event fan-out, and snapshots
pub struct SessionManager {
    local_participant: ParticipantId,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionState>>>>,
}

// Listener panics are caught during emit, so a poisoned lock still guards
// consistent state.
fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl SessionManager {
    pub fn new(local_participant: impl Into<ParticipantId>) -> Self {
        Self {
            local_participant: local_participant.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn local_participant(&self) -> &ParticipantId {
        &self.local_participant
    }

    fn state(&self, session_id: &str) -> Option<Arc<Mutex<SessionState>>> {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(session_id)
            .cloned()
    }

    fn register(&self, state: SessionState) -> SessionId {
        let session_id = state.session.id.clone();
        self.sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(session_id.clone(), Arc::new(Mutex::new(state)));
        session_id
    }

    /// Open a session: a fresh document seeded with `initial_content`, bound
    /// to a new session with full permissions for the local participant
    pub fn create_session(
        &self,
        document_id: impl Into<DocumentId>,
        initial_content: impl Into<String>,
    ) -> Session {
        let document_id = document_id.into();
        let owner = Participant::new(
            self.local_participant.clone(),
            self.local_participant.clone(),
        );
        let session = Session::new(document_id.clone(), owner);
        let state = SessionState {
            session: session.clone(),
            document: Document::new(document_id, initial_content),
            gate: CausalGate::new(),
            listeners: ListenerSet::new(),
        };
        self.register(state);
        log::debug!(
            "created session {} for document {}",
            session.id,
            session.document_id
        );
        session
    }

    /// Add a participant to a session, replacing any existing entry with the
    /// same id and marking it online. Unknown sessions are caller misuse.
    pub fn join_session(
        &self,
        session_id: &str,
        mut participant: Participant,
    ) -> Result<(), SyncError> {
        let state = self
            .state(session_id)
            .ok_or_else(|| SyncError::SessionNotFound(session_id.to_string()))?;
        let mut guard = lock_state(&state);

        participant.online = true;
        let event = SessionEvent::participant(ParticipantAction::Joined, participant.clone());
        guard.session.upsert_participant(participant);
        guard.listeners.emit(&event);
        Ok(())
    }

    /// Mark a participant offline and stamp its last-active time. Unknown
    /// sessions and participants are benign (messages race teardown).
    pub fn leave_session(&self, session_id: &str, participant_id: &str) {
        let Some(state) = self.state(session_id) else {
            return;
        };
        let mut guard = lock_state(&state);

        let snapshot = match guard.session.participant_mut(participant_id) {
            Some(participant) => {
                participant.online = false;
                participant.last_active = Utc::now();
                participant.clone()
            }
            None => return,
        };
        guard.session.updated_at = Utc::now();
        guard
            .listeners
            .emit(&SessionEvent::participant(ParticipantAction::Left, snapshot));
    }

    /// Tear down a session and its document together. Idempotent; all
    /// subscribers are dropped with the state.
    pub fn close_session(&self, session_id: &str) {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(session_id);
        if let Some(state) = removed {
            lock_state(&state).session.active = false;
            log::debug!("closed session {}", session_id);
        }
    }

    /// Author a local edit: stamp it with this replica's incremented clock
    /// entry, apply it, and return the operation for external broadcast.
    ///
    /// This is the only path that increments the local clock entry; remote
    /// operations never do.
    pub fn apply_local_edit(&self, session_id: &str, edit: Edit) -> Result<Operation, SyncError> {
        let state = self
            .state(session_id)
            .ok_or_else(|| SyncError::SessionNotFound(session_id.to_string()))?;
        let mut guard = lock_state(&state);

        if !guard.session.permissions.can_edit {
            return Err(SyncError::PermissionDenied(session_id.to_string()));
        }

        let mut clock = guard.document.vector_clock().clone();
        clock.increment(&self.local_participant);
        let op = Operation::new(self.local_participant.clone(), clock, edit);

        guard.apply_and_notify(op.clone());
        guard.drain_backlog();
        Ok(op)
    }

    /// Offer a peer's operation to the causal gate. Returns `None` when the
    /// session is already gone, otherwise the gate's tagged outcome.
    pub fn apply_remote_op(&self, session_id: &str, op: Operation) -> Option<Admission> {
        let state = self.state(session_id)?;
        let mut guard = lock_state(&state);

        if guard.document.contains_op(&op.id) || guard.gate.holds(&op.id) {
            log::debug!("dropping duplicate operation {} for session {}", op.id, session_id);
            return Some(Admission::Rejected);
        }

        if gate::admissible(guard.document.vector_clock(), &op) {
            guard.apply_and_notify(op);
            guard.drain_backlog();
            Some(Admission::Applied)
        } else {
            log::debug!(
                "parking operation {} from {}: prerequisite history not yet observed",
                op.id,
                op.origin
            );
            guard.gate.park(op);
            Some(Admission::Buffered)
        }
    }

    /// Record a participant's cursor and notify subscribers; no-op when the
    /// session or participant is unknown
    pub fn update_cursor(&self, session_id: &str, participant_id: &str, cursor: CursorPosition) {
        let Some(state) = self.state(session_id) else {
            return;
        };
        let mut guard = lock_state(&state);

        match guard.session.participant_mut(participant_id) {
            Some(participant) => {
                participant.cursor = Some(cursor.clone());
                participant.last_active = Utc::now();
            }
            None => return,
        }
        guard
            .listeners
            .emit(&SessionEvent::cursor(participant_id.to_string(), cursor));
    }

    /// Replace a session's permission flags
    pub fn set_permissions(
        &self,
        session_id: &str,
        permissions: SessionPermissions,
    ) -> Result<(), SyncError> {
        let state = self
            .state(session_id)
            .ok_or_else(|| SyncError::SessionNotFound(session_id.to_string()))?;
        let mut guard = lock_state(&state);
        guard.session.permissions = permissions;
        guard.session.updated_at = Utc::now();
        Ok(())
    }

    pub fn document_content(&self, session_id: &str) -> Option<String> {
        let state = self.state(session_id)?;
        let guard = lock_state(&state);
        Some(guard.document.content().to_string())
    }

    pub fn session(&self, session_id: &str) -> Option<Session> {
        let state = self.state(session_id)?;
        let guard = lock_state(&state);
        Some(guard.session.clone())
    }

    /// Register a synchronous listener for a session's events. Returns `None`
    /// when the session is unknown.
    pub fn subscribe(
        &self,
        session_id: &str,
        callback: impl Fn(&SessionEvent) + Send + Sync + 'static,
    ) -> Option<Subscription> {
        let state = self.state(session_id)?;
        let id = lock_state(&state).listeners.add(Box::new(callback));
        Some(Subscription {
            state: Arc::downgrade(&state),
            id,
        })
    }

    /// A broadcast receiver carrying the same events as `subscribe`, for
    /// async consumers
    pub fn event_stream(&self, session_id: &str) -> Option<broadcast::Receiver<SessionEvent>> {
        let state = self.state(session_id)?;
        let guard = lock_state(&state);
        Some(guard.listeners.stream())
    }

    /// Render a session and its document as a self-contained snapshot
    pub fn serialize_state(&self, session_id: &str) -> Option<String> {
        let state = self.state(session_id)?;
        let guard = lock_state(&state);
        SessionSnapshot {
            session: guard.session.clone(),
            document: guard.document.clone(),
        }
        .encode()
    }

    /// Restore a session from a snapshot (fresh backlog, no listeners) and
    /// return its id; `None` on any parse or shape failure
    pub fn deserialize_state(&self, raw: &str) -> Option<SessionId> {
        let snapshot = SessionSnapshot::decode(raw)?;
        let session_id = self.register(SessionState {
            session: snapshot.session,
            document: snapshot.document,
            gate: CausalGate::new(),
            listeners: ListenerSet::new(),
        });
        log::debug!("restored session {} from snapshot", session_id);
        Some(session_id)
    }
}
