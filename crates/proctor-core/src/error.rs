// Error types for the aggregation engine

use thiserror::Error;

use crate::session::SessionStatus;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, ProctorError>;

/// Errors that can occur while tracking a proctored session
///
/// All variants are expected, recoverable conditions. They are returned to
/// the caller as typed results and never abort the process; the transport
/// layer decides how to surface them.
#[derive(Debug, Error)]
pub enum ProctorError {
    /// A session with this id already exists
    #[error("session already exists: {0}")]
    DuplicateSession(String),

    /// No session with this id
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The requested status transition is not allowed from the current state
    #[error("invalid transition for session {session_id}: already {status}")]
    InvalidTransition {
        session_id: String,
        status: SessionStatus,
    },

    /// The event failed structural validation
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// The session is completed or cancelled; its event log is immutable
    #[error("session closed: {0}")]
    SessionClosed(String),

    /// Storage backend failure
    #[error("store error: {0}")]
    Store(String),
}

impl ProctorError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        ProctorError::Store(msg.into())
    }

    /// Create an invalid event error
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        ProctorError::InvalidEvent(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(session_id: impl Into<String>) -> Self {
        ProctorError::SessionNotFound(session_id.into())
    }

    /// Whether ingestion callers should treat this as non-fatal
    ///
    /// `SessionNotFound` and `SessionClosed` during event ingestion must not
    /// tear down the real-time connection; the stream keeps flowing for
    /// other sessions.
    pub fn is_non_fatal_ingest(&self) -> bool {
        matches!(
            self,
            ProctorError::SessionNotFound(_)
                | ProctorError::SessionClosed(_)
                | ProctorError::InvalidEvent(_)
        )
    }
}
