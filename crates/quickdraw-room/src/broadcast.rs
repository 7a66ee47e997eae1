//! Fan-out of events to everyone in a room.

use std::collections::BTreeMap;

use quickdraw_protocol::{ParticipantId, ServerEvent};
use tokio::sync::mpsc;

/// Channel for delivering events to one connection.
///
/// Unbounded so a room never waits on a slow client. The connection's
/// writer task owns the receiving end.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

/// The connections currently attached to a room: its host, its
/// contestants, and any former host still watching.
#[derive(Debug, Default)]
pub struct Members {
    outboxes: BTreeMap<ParticipantId, Outbox>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a connection, replacing its outbox if already attached.
    pub fn insert(&mut self, participant: ParticipantId, outbox: Outbox) {
        self.outboxes.insert(participant, outbox);
    }

    /// Detaches a connection. Returns `true` if it was attached.
    pub fn remove(&mut self, participant: ParticipantId) -> bool {
        self.outboxes.remove(&participant).is_some()
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.outboxes.contains_key(&participant)
    }

    /// Sends an event to one member. Dropped silently if the member is
    /// gone or its connection has already closed.
    pub fn send_to(&self, participant: ParticipantId, event: ServerEvent) {
        if let Some(outbox) = self.outboxes.get(&participant) {
            let _ = outbox.send(event);
        }
    }

    /// Sends an event to every member. Returns how many outboxes took it.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        self.outboxes
            .values()
            .filter(|outbox| outbox.send(event.clone()).is_ok())
            .count()
    }
}
