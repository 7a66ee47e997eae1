//! Error types for the room layer.

use quickdraw_protocol::{ParticipantId, RoomCode, RoundStatus};
use quickdraw_session::SessionError;

use crate::RoundAction;

/// Errors that can occur during room operations.
///
/// Every variant is recoverable: the server turns it into an error event
/// for the one connection that caused it.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The text given as a room code cannot be a room code.
    #[error("malformed room code {0:?}")]
    InvalidCode(String),

    /// Display name empty after trimming, or too long.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The host of a room tried to join it as a contestant.
    #[error("the host of room {0} cannot join it as a contestant")]
    HostCannotCompete(RoomCode),

    /// A host-only command from someone who is not the room's host, or
    /// a room command from someone who is not in the room.
    #[error("{participant} may not {action} in room {code}")]
    Unauthorized {
        participant: ParticipantId,
        code: RoomCode,
        action: &'static str,
    },

    /// The round is in a state that does not allow this transition.
    #[error("cannot {action} while the round is {status}")]
    InvalidTransition {
        action: RoundAction,
        status: RoundStatus,
    },

    /// Every room code is in use.
    #[error("no free room codes left")]
    RegistryFull,

    /// The room's actor has stopped (the room is being destroyed).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// Session bookkeeping failed (e.g. a room command from an unbound
    /// connection).
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RoomError {
    /// HTTP-style status used for the wire error event.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCode(_) | Self::InvalidName(_) | Self::HostCannotCompete(_) => 400,
            Self::Unauthorized { .. } | Self::Session(SessionError::NotBound(_)) => 403,
            Self::NotFound(_) | Self::Unavailable(_) => 404,
            Self::InvalidTransition { .. } => 409,
            Self::RegistryFull => 503,
            Self::Session(_) => 500,
        }
    }

    /// Message shown to the user.
    ///
    /// A room that is shutting down looks the same as one that is gone.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(code) => Self::NotFound(code.clone()).to_string(),
            other => other.to_string(),
        }
    }
}
