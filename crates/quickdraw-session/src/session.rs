//! Session types: one record per live connection.

use std::fmt;

use quickdraw_protocol::{ParticipantId, RoomCode};
use tokio::time::Instant;

/// The part a participant plays in its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Controls the round. Bound by `CreateRoom` or `JoinAsHost`.
    Host,
    /// Competes to signal first. Bound by `JoinRoom`.
    Contestant,
    /// Still receives the room's events but controls nothing. A host
    /// replaced by another connection's `JoinAsHost` ends up here.
    Observer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Contestant => f.write_str("contestant"),
            Self::Observer => f.write_str("observer"),
        }
    }
}

/// The room a session is bound to and in which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub code: RoomCode,
    pub role: Role,
}

/// A single connection's session.
///
/// Lives from handshake until the connection closes. `binding` changes as
/// the participant creates, joins, or leaves rooms.
#[derive(Debug, Clone)]
pub struct Session {
    pub participant: ParticipantId,
    pub binding: Option<Binding>,
    /// When the handshake completed.
    pub opened_at: Instant,
}

impl Session {
    /// Returns `true` if this session is bound to `code`.
    pub fn is_bound_to(&self, code: &RoomCode) -> bool {
        self.binding.as_ref().is_some_and(|b| &b.code == code)
    }
}
