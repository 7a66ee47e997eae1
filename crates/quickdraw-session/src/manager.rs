//! The session manager: the table of live connections and their bindings.
//!
//! # Concurrency note
//!
//! `SessionManager` is a plain struct with no interior locking. The server
//! owns one behind a `tokio::sync::Mutex` and never holds that lock while
//! waiting on a room.

use std::collections::{BTreeSet, HashMap};

use quickdraw_protocol::{ParticipantId, RoomCode};
use tokio::time::Instant;

use crate::{Binding, Role, Session, SessionError};

/// Tracks every open session and which room each one is bound to.
///
/// Two maps are kept in step: sessions by participant, and the reverse
/// index from room code to bound participants. The reverse index is what
/// lets a destroyed room release all of its bindings in one call.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ParticipantId, Session>,
    rooms: HashMap<RoomCode, BTreeSet<ParticipantId>>,
}

impl SessionManager {
    /// Creates an empty session table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an unbound session for a freshly handshaken connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyOpen`] if this participant already has one.
    pub fn open(&mut self, participant: ParticipantId) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&participant) {
            return Err(SessionError::AlreadyOpen(participant));
        }
        let session = self.sessions.entry(participant).or_insert(Session {
            participant,
            binding: None,
            opened_at: Instant::now(),
        });
        tracing::debug!(%participant, "session opened");
        Ok(session)
    }

    /// Closes a session and returns the binding it held, if any.
    ///
    /// The caller is responsible for telling that room the participant
    /// is gone.
    pub fn close(&mut self, participant: ParticipantId) -> Result<Option<Binding>, SessionError> {
        let session = self
            .sessions
            .remove(&participant)
            .ok_or(SessionError::NotFound(participant))?;
        if let Some(binding) = &session.binding {
            self.forget_member(&binding.code, participant);
        }
        tracing::debug!(
            %participant,
            open_for = ?session.opened_at.elapsed(),
            "session closed"
        );
        Ok(session.binding)
    }

    /// Binds a participant to a room, replacing any previous binding.
    ///
    /// A room has at most one host binding: binding a new host turns any
    /// other host of that room into an observer.
    ///
    /// Returns the previous binding so the caller can detach the
    /// participant from the old room when it differs.
    pub fn bind(
        &mut self,
        participant: ParticipantId,
        code: RoomCode,
        role: Role,
    ) -> Result<Option<Binding>, SessionError> {
        let session = self
            .sessions
            .get_mut(&participant)
            .ok_or(SessionError::NotFound(participant))?;
        let previous = session.binding.replace(Binding {
            code: code.clone(),
            role,
        });

        if let Some(old) = &previous {
            if old.code != code {
                self.forget_member(&old.code, participant);
            }
        }
        let members = self.rooms.entry(code.clone()).or_default();
        members.insert(participant);

        if role == Role::Host {
            for other in members.iter().filter(|&&p| p != participant) {
                let Some(binding) = self
                    .sessions
                    .get_mut(other)
                    .and_then(|s| s.binding.as_mut())
                else {
                    continue;
                };
                if binding.role == Role::Host {
                    binding.role = Role::Observer;
                    tracing::debug!(participant = %other, room = %code, "host demoted to observer");
                }
            }
        }

        tracing::debug!(%participant, room = %code, %role, "session bound");
        Ok(previous)
    }

    /// Drops a participant's binding without closing the session.
    pub fn unbind(&mut self, participant: ParticipantId) -> Result<Option<Binding>, SessionError> {
        let session = self
            .sessions
            .get_mut(&participant)
            .ok_or(SessionError::NotFound(participant))?;
        let previous = session.binding.take();
        if let Some(old) = &previous {
            self.forget_member(&old.code, participant);
        }
        Ok(previous)
    }

    /// Releases every binding to `code` and returns who was bound.
    ///
    /// Called when a room is destroyed. Sessions stay open; they are just
    /// no longer in a room.
    pub fn release_room(&mut self, code: &RoomCode) -> Vec<ParticipantId> {
        let Some(members) = self.rooms.remove(code) else {
            return Vec::new();
        };
        for participant in &members {
            if let Some(session) = self.sessions.get_mut(participant) {
                if session.is_bound_to(code) {
                    session.binding = None;
                }
            }
        }
        tracing::debug!(room = %code, released = members.len(), "room bindings released");
        members.into_iter().collect()
    }

    /// Returns the participant's binding.
    ///
    /// # Errors
    /// [`SessionError::NotBound`] if the session exists but is not in a
    /// room, [`SessionError::NotFound`] if there is no session at all.
    pub fn binding(&self, participant: ParticipantId) -> Result<&Binding, SessionError> {
        self.sessions
            .get(&participant)
            .ok_or(SessionError::NotFound(participant))?
            .binding
            .as_ref()
            .ok_or(SessionError::NotBound(participant))
    }

    /// Looks up a session.
    pub fn get(&self, participant: &ParticipantId) -> Option<&Session> {
        self.sessions.get(participant)
    }

    /// Participants bound to `code`, in id order.
    #[cfg(test)]
    fn members(&self, code: &RoomCode) -> Vec<ParticipantId> {
        self.rooms
            .get(code)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of open sessions, bound or not.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn forget_member(&mut self, code: &RoomCode, participant: ParticipantId) {
        if let Some(set) = self.rooms.get_mut(code) {
            set.remove(&participant);
            if set.is_empty() {
                self.rooms.remove(code);
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
