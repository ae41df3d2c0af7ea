//! Cowrite - Collaborative Document Synchronization Core
//!
//! Lets multiple participants concurrently edit a shared text document and
//! converge without a central arbiter of ordering. Local edits are stamped
//! with a vector clock and applied immediately; remote edits pass a causal
//! gate that applies, parks, or rejects them. Transport, persistence, and
//! rendering are external collaborators: this crate hands operations out for
//! broadcast, consumes operations fed in from peers, and produces serializable
//! snapshots for resume.

pub mod clock;
pub mod document;
pub mod error;
pub mod events;
pub mod gate;
pub mod manager;
pub mod op;
pub mod session;
pub mod snapshot;

pub use clock::{ParticipantId, VectorClock};
pub use document::{Document, DocumentId};
pub use error::SyncError;
pub use events::{EventKind, EventPayload, ParticipantAction, SessionEvent};
pub use gate::{Admission, CausalGate};
pub use manager::{SessionManager, Subscription};
pub use op::{Edit, OpId, Operation};
pub use session::{CursorPosition, Participant, Session, SessionId, SessionPermissions};
pub use snapshot::SessionSnapshot;
