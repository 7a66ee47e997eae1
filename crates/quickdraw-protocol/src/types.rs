//! Core protocol types for Quickdraw's wire format.
//!
//! Clients send [`ClientCommand`]s and receive [`ServerEvent`]s, both
//! wrapped in an [`Envelope`]. Everything here is plain data: the rules
//! about who may send what live in the room and server crates.

use std::fmt;

use quickdraw_transport::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::RoomCode;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The ephemeral identity of one participant: the id of the connection it
/// arrived on.
///
/// Serialized as a bare number so clients can compare it against the id
/// they were given in [`ServerEvent::HandshakeAck`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for ParticipantId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Room views
// ---------------------------------------------------------------------------

/// Where a room's round currently stands.
///
/// ```text
///   Idle ──start──→ Active ──stop──→ Stopped
///    ↑                │                 │
///    └────reset───────┴──────reset──────┘   (Stopped ──start──→ Active)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundStatus {
    /// No round running. Initial state and the state after a reset.
    #[default]
    Idle,
    /// Round open: contestants may signal.
    Active,
    /// Round closed: signals are ignored, the arrival order stays visible.
    Stopped,
}

impl RoundStatus {
    /// Returns `true` if signals are accepted in this state.
    pub fn accepts_signals(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Active => f.write_str("Active"),
            Self::Stopped => f.write_str("Stopped"),
        }
    }
}

/// One contestant as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestantView {
    pub id: ParticipantId,
    pub name: String,
    /// Milliseconds from round start to this contestant's signal, or
    /// `null` if they have not signalled this round.
    pub elapsed_ms: Option<u64>,
}

/// The full, consistent view of a room at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub status: RoundStatus,
    /// The connection currently holding host authority.
    pub host: ParticipantId,
    /// Every contestant, ordered by id.
    pub contestants: Vec<ContestantView>,
    /// Contestants who signalled this round, in rank order (rank = index + 1).
    pub arrivals: Vec<ContestantView>,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
///
/// Internally tagged: `{ "type": "JoinRoom", "code": "K7F2QX", "name": "Mona" }`.
/// Room codes arrive as raw strings so that a malformed code can be
/// answered with an error instead of being dropped at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Must be the first message on a connection.
    Handshake { version: u32 },

    /// Keep-alive. Answered with [`ServerEvent::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    /// Open a new room with the sender as host.
    CreateRoom,

    /// Take over as host of an existing room (host reconnect).
    JoinAsHost { code: String },

    /// Join a room as a contestant, or rename yourself if already in it.
    JoinRoom { code: String, name: String },

    StartRound,
    StopRound,
    ResetRound,

    /// "I'm first!" Accepted at most once per contestant per round.
    Signal,

    /// Ask for a fresh [`ServerEvent::State`] for your own room.
    RequestState,

    /// Drop your room binding without closing the connection.
    Leave,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server tells clients.
///
/// Narrow events (`ContestantJoined`, `SignalAccepted`, ...) are hints for
/// UI effects. `State` is the source of truth and follows every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Handshake accepted. `participant_id` is how this connection shows
    /// up in snapshots.
    HandshakeAck {
        participant_id: ParticipantId,
        server_time: u64,
    },

    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Sent to the creator only.
    RoomCreated { code: RoomCode },

    /// Sent to the new host only.
    HostJoined { code: RoomCode },

    /// Sent to the joining contestant only.
    Joined {
        code: RoomCode,
        contestant: ContestantView,
    },

    ContestantJoined { contestant: ContestantView },

    ContestantLeft { contestant: ContestantView },

    RoundStarted,
    RoundStopped,
    RoundReset,

    SignalAccepted {
        contestant: ParticipantId,
        name: String,
        rank: u32,
        elapsed_ms: u64,
    },

    /// Full room snapshot.
    State(RoomSnapshot),

    /// The room is gone (its host disconnected). Members are unbound.
    RoomClosed { code: RoomCode, reason: String },

    /// A command from this connection was rejected. `code` follows HTTP
    /// conventions: 400 bad input, 403 not allowed, 404 no such room,
    /// 409 wrong round state.
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged: `{ "type": "Command", "data": { "type": "Signal" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Command(ClientCommand),
    Event(ServerEvent),
}

/// The top-level message wrapper. Every frame on the wire is one Envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-direction sequence number, starting at 0 with the handshake.
    pub seq: u64,

    /// Sender clock in milliseconds. The server uses time since startup.
    pub timestamp: u64,

    pub payload: Payload,
}

impl Envelope {
    /// Wraps a client command.
    pub fn command(seq: u64, timestamp: u64, command: ClientCommand) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Command(command),
        }
    }

    /// Wraps a server event.
    pub fn event(seq: u64, timestamp: u64, event: ServerEvent) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Event(event),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
