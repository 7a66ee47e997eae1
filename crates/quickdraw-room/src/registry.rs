//! Room registry: the set of live rooms, keyed by code.

use std::collections::HashMap;

use quickdraw_protocol::{ParticipantId, RoomCode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::room::spawn_room;
use crate::{Outbox, RoomConfig, RoomError, RoomHandle};

/// Owns every live room and hands out fresh codes.
///
/// There is no global registry; the server builds one and tests build as
/// many as they like. Like [`quickdraw_session::SessionManager`] it has no
/// interior locking.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    rng: StdRng,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry seeded from the OS.
    pub fn new(config: RoomConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates an empty registry that draws codes from `rng`.
    pub fn with_rng(config: RoomConfig, rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            rng,
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room under a fresh code with `host` bound as its host.
    ///
    /// # Errors
    /// [`RoomError::RegistryFull`] if every code is taken.
    pub fn create_room(
        &mut self,
        host: ParticipantId,
        outbox: Outbox,
    ) -> Result<RoomHandle, RoomError> {
        let code = self.generate_code()?;
        let handle = spawn_room(code.clone(), host, outbox, &self.config);
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, %host, rooms = self.rooms.len(), "room created");
        Ok(handle)
    }

    pub fn find(&self, code: &RoomCode) -> Option<&RoomHandle> {
        self.rooms.get(code)
    }

    /// Looks up a room by user-typed code, case-insensitively.
    ///
    /// # Errors
    /// [`RoomError::InvalidCode`] if `raw` cannot be a code,
    /// [`RoomError::NotFound`] if no live room has it.
    pub fn lookup(&self, raw: &str) -> Result<RoomHandle, RoomError> {
        let code = RoomCode::parse(raw).map_err(|_| RoomError::InvalidCode(raw.to_string()))?;
        self.rooms
            .get(&code)
            .cloned()
            .ok_or(RoomError::NotFound(code))
    }

    /// Takes a room out of the registry. Its code is free again at once.
    ///
    /// Does not stop the actor; see [`RoomHandle::shutdown`].
    pub fn remove(&mut self, code: &RoomCode) -> Option<RoomHandle> {
        let handle = self.rooms.remove(code)?;
        tracing::info!(room = %code, rooms = self.rooms.len(), "room removed");
        Some(handle)
    }

    /// Returns `true` if `handle` is still the registered room for its
    /// code. A room that was destroyed and whose code was reused by a new
    /// room does not count.
    pub fn is_current(&self, handle: &RoomHandle) -> bool {
        self.rooms
            .get(handle.code())
            .is_some_and(|live| live.same_room(handle))
    }

    #[cfg(test)]
    fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    pub(crate) fn len(&self) -> usize {
        self.rooms.len()
    }

    fn generate_code(&mut self) -> Result<RoomCode, RoomError> {
        let rooms = &self.rooms;
        let index = pick_free_index(
            &mut self.rng,
            RoomCode::SPACE,
            self.config.random_code_attempts,
            |i| rooms.contains_key(&RoomCode::from_index(i)),
        );
        match index {
            Some(i) => Ok(RoomCode::from_index(i)),
            None => {
                tracing::error!(rooms = self.rooms.len(), "room code space exhausted");
                Err(RoomError::RegistryFull)
            }
        }
    }
}

/// Picks an index in `0..space` for which `taken` is false.
///
/// Tries `attempts` uniform draws, then walks the whole space once from a
/// random offset. Returns `None` only when every index is taken.
fn pick_free_index(
    rng: &mut impl Rng,
    space: u64,
    attempts: usize,
    taken: impl Fn(u64) -> bool,
) -> Option<u64> {
    for _ in 0..attempts {
        let i = rng.random_range(0..space);
        if !taken(i) {
            return Some(i);
        }
    }
    let offset = rng.random_range(0..space);
    (0..space)
        .map(|step| (offset + step) % space)
        .find(|&i| !taken(i))
}
