//! Unified error type for the Quickdraw server.

use quickdraw_protocol::ProtocolError;
use quickdraw_room::RoomError;
use quickdraw_session::SessionError;
use quickdraw_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum QuickdrawError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad handshake).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session bookkeeping error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, unauthorized, bad transition).
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl QuickdrawError {
    /// HTTP-style status for the wire error event.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Room(err) => err.status_code(),
            Self::Protocol(_) => 400,
            Self::Session(SessionError::NotBound(_)) => 403,
            Self::Session(_) | Self::Transport(_) => 500,
        }
    }

    /// Text for the wire error event.
    pub fn user_message(&self) -> String {
        match self {
            Self::Room(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}
