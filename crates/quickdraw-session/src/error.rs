//! Error types for the session layer.

use quickdraw_protocol::ParticipantId;

/// Errors that can occur while tracking connection sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session is open for this participant (never opened, or
    /// already closed).
    #[error("no session for participant {0}")]
    NotFound(ParticipantId),

    /// A session is already open for this participant. Connection ids are
    /// never reused, so this points at a handler bug.
    #[error("participant {0} already has an open session")]
    AlreadyOpen(ParticipantId),

    /// The participant sent a room command without being bound to a room.
    #[error("participant {0} is not in a room")]
    NotBound(ParticipantId),
}
