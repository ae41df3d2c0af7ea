use thiserror::Error;

use crate::session::SessionId;

/// Error types for session and document operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Editing is not permitted in session {0}")]
    PermissionDenied(SessionId),
}
