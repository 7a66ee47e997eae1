//! The coordinator: routes participants' commands to their rooms.
//!
//! # Locking
//!
//! The registry and the session table each sit behind one async mutex.
//! When both are needed they are taken registry first, then sessions.
//! Neither is held while waiting on a room actor: handles are cloned out
//! and the locks dropped before the `.await`.
//!
//! Because of that gap a room can close between being looked up and being
//! bound to. Bindings are therefore only recorded while the registry lock
//! proves the room is still the live one for its code.

use quickdraw_protocol::{ContestantView, ParticipantId, RoomCode, RoomSnapshot};
use quickdraw_session::{Role, SessionError, SessionManager};
use tokio::sync::Mutex;

use crate::arbitration::Arrival;
use crate::room::Departure;
use crate::{Outbox, RoomConfig, RoomError, RoomHandle, RoomRegistry, RoundAction, validate_name};

/// Owns the room registry and the session table and is the single entry
/// point for everything a connection can ask of the room layer.
#[derive(Debug)]
pub struct Coordinator {
    registry: Mutex<RoomRegistry>,
    sessions: Mutex<SessionManager>,
    max_name_chars: usize,
}

impl Coordinator {
    pub fn new(config: RoomConfig) -> Self {
        Self::with_registry(RoomRegistry::new(config))
    }

    /// Builds a coordinator around an existing (e.g. seeded) registry.
    pub fn with_registry(registry: RoomRegistry) -> Self {
        let max_name_chars = registry.config().max_name_chars;
        Self {
            registry: Mutex::new(registry),
            sessions: Mutex::new(SessionManager::new()),
            max_name_chars,
        }
    }

    /// Registers a new connection. It starts out in no room.
    pub async fn open_session(&self, participant: ParticipantId) -> Result<(), RoomError> {
        self.sessions.lock().await.open(participant)?;
        Ok(())
    }

    /// Connection lost: forget the session and leave its room. Losing the
    /// host destroys the room.
    pub async fn close_session(&self, participant: ParticipantId) -> Result<(), RoomError> {
        let binding = self.sessions.lock().await.close(participant)?;
        if let Some(binding) = binding {
            self.depart(participant, &binding.code).await;
        }
        Ok(())
    }

    /// Creates a room with `participant` as host and returns its code.
    ///
    /// Any previous binding is released first, as if by [`Self::leave`].
    pub async fn create_room(
        &self,
        participant: ParticipantId,
        outbox: &Outbox,
    ) -> Result<RoomCode, RoomError> {
        self.detach_unless(participant, None).await?;

        let mut registry = self.registry.lock().await;
        let mut sessions = self.sessions.lock().await;
        if sessions.get(&participant).is_none() {
            return Err(SessionError::NotFound(participant).into());
        }
        let handle = registry.create_room(participant, outbox.clone())?;
        let code = handle.code().clone();
        sessions.bind(participant, code.clone(), Role::Host)?;
        Ok(code)
    }

    /// Makes `participant` the host of an existing room (host reconnect).
    ///
    /// The previous host keeps receiving updates but loses authority.
    /// Contestants, arrivals and the round status are untouched.
    pub async fn join_as_host(
        &self,
        participant: ParticipantId,
        raw_code: &str,
        outbox: &Outbox,
    ) -> Result<RoomSnapshot, RoomError> {
        let handle = self.registry.lock().await.lookup(raw_code)?;
        self.detach_unless(participant, Some(handle.code())).await?;

        let snapshot = handle
            .join_as_host(participant, outbox.clone())
            .await
            .map_err(gone)?;
        self.bind_if_current(participant, &handle, Role::Host).await?;
        Ok(snapshot)
    }

    /// Joins a room as a contestant, or renames the caller if it is
    /// already one.
    pub async fn join_room(
        &self,
        participant: ParticipantId,
        raw_code: &str,
        raw_name: &str,
        outbox: &Outbox,
    ) -> Result<ContestantView, RoomError> {
        let name = validate_name(raw_name, self.max_name_chars)?;
        let handle = self.registry.lock().await.lookup(raw_code)?;
        self.detach_unless(participant, Some(handle.code())).await?;

        let view = handle
            .join(participant, name, outbox.clone())
            .await
            .map_err(gone)?;
        self.bind_if_current(participant, &handle, Role::Contestant)
            .await?;
        Ok(view)
    }

    /// Applies a host round command in the caller's room.
    pub async fn round(
        &self,
        participant: ParticipantId,
        action: RoundAction,
    ) -> Result<(), RoomError> {
        let (handle, role) = self.bound_room(participant).await?;
        // The room checks again; a binding can lag behind a takeover.
        if role != Role::Host {
            return Err(RoomError::Unauthorized {
                participant,
                code: handle.code().clone(),
                action: action.describe(),
            });
        }
        handle.round(participant, action).await.map_err(gone)
    }

    /// Submits a signal. `Ok(None)` means it was ignored, which is not an
    /// error: late, duplicate and off-round signals are dropped silently.
    pub async fn signal(&self, participant: ParticipantId) -> Result<Option<Arrival>, RoomError> {
        let (handle, _) = self.bound_room(participant).await?;
        Ok(handle.signal(participant).await.map_err(gone)?.ok())
    }

    /// Sends the caller a fresh snapshot of its room.
    pub async fn request_state(&self, participant: ParticipantId) -> Result<RoomSnapshot, RoomError> {
        let (handle, _) = self.bound_room(participant).await?;
        handle.request_state(participant).await.map_err(gone)
    }

    /// Drops the caller's binding without closing its connection.
    ///
    /// # Errors
    /// [`SessionError::NotBound`] if the caller is in no room.
    pub async fn leave(&self, participant: ParticipantId) -> Result<(), RoomError> {
        let binding = self
            .sessions
            .lock()
            .await
            .unbind(participant)?
            .ok_or(SessionError::NotBound(participant))?;
        self.depart(participant, &binding.code).await;
        Ok(())
    }

    /// Removes a room, unbinds all its members and tells them why.
    pub async fn destroy_room(&self, code: &RoomCode, reason: &str) -> Result<(), RoomError> {
        let handle = {
            let mut registry = self.registry.lock().await;
            let handle = registry
                .remove(code)
                .ok_or_else(|| RoomError::NotFound(code.clone()))?;
            self.sessions.lock().await.release_room(code);
            handle
        };
        // The actor may already have stopped on its own.
        if handle.shutdown(reason).await.is_err() {
            tracing::debug!(room = %code, "room already stopped");
        }
        Ok(())
    }

    /// Resolves a user-typed code to a live room's code.
    pub async fn find_room(&self, raw_code: &str) -> Result<RoomCode, RoomError> {
        Ok(self.registry.lock().await.lookup(raw_code)?.code().clone())
    }

    pub async fn room_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// The room `participant` is bound to, and in which role.
    async fn bound_room(&self, participant: ParticipantId) -> Result<(RoomHandle, Role), RoomError> {
        let (code, role) = {
            let sessions = self.sessions.lock().await;
            let binding = sessions.binding(participant)?;
            (binding.code.clone(), binding.role)
        };
        let handle = self
            .registry
            .lock()
            .await
            .find(&code)
            .cloned()
            .ok_or(RoomError::NotFound(code))?;
        Ok((handle, role))
    }

    /// Releases the caller's binding unless it is already to `keep`.
    async fn detach_unless(
        &self,
        participant: ParticipantId,
        keep: Option<&RoomCode>,
    ) -> Result<(), RoomError> {
        let previous = {
            let mut sessions = self.sessions.lock().await;
            let stale = match sessions.binding(participant) {
                Ok(binding) => Some(&binding.code) != keep,
                Err(SessionError::NotBound(_)) => false,
                Err(err) => return Err(err.into()),
            };
            if stale {
                sessions.unbind(participant)?
            } else {
                None
            }
        };
        if let Some(binding) = previous {
            tracing::debug!(%participant, room = %binding.code, "switching rooms");
            self.depart(participant, &binding.code).await;
        }
        Ok(())
    }

    async fn bind_if_current(
        &self,
        participant: ParticipantId,
        handle: &RoomHandle,
        role: Role,
    ) -> Result<(), RoomError> {
        let registry = self.registry.lock().await;
        if handle.is_closed() || !registry.is_current(handle) {
            return Err(RoomError::NotFound(handle.code().clone()));
        }
        self.sessions
            .lock()
            .await
            .bind(participant, handle.code().clone(), role)?;
        Ok(())
    }

    /// Tells a room that `participant` is gone. If that was the host, the
    /// room is taken out of the registry and everyone in it is unbound.
    async fn depart(&self, participant: ParticipantId, code: &RoomCode) {
        let Some(handle) = self.registry.lock().await.find(code).cloned() else {
            return;
        };
        match handle.leave(participant).await {
            Ok(Departure::HostLost) => self.forget_room(&handle).await,
            Ok(departure) => {
                tracing::debug!(%participant, room = %code, ?departure, "left room");
            }
            Err(_) => {
                tracing::debug!(%participant, room = %code, "room already closed");
            }
        }
    }

    async fn forget_room(&self, handle: &RoomHandle) {
        let mut registry = self.registry.lock().await;
        if !registry.is_current(handle) {
            return;
        }
        registry.remove(handle.code());
        let released = self.sessions.lock().await.release_room(handle.code());
        tracing::info!(room = %handle.code(), released = released.len(), "room destroyed");
    }
}

/// A room whose actor has stopped is reported as not found.
fn gone(err: RoomError) -> RoomError {
    match err {
        RoomError::Unavailable(code) => RoomError::NotFound(code),
        other => other,
    }
}
