//! The room record: who is in it and what the current round looks like.
//!
//! [`Room`] is plain data plus the operations that keep its invariants.
//! It knows nothing about tasks or channels; the actor in `room.rs` owns
//! one and is the only thing that ever touches it, which is what makes
//! every method here effectively atomic.
//!
//! Invariants kept by every method:
//!
//! - `arrivals` has no duplicates and only names current contestants.
//! - A contestant's `elapsed` is set iff it appears in `arrivals`.
//! - `round_start` is set whenever the status is `Active`.

use std::collections::BTreeMap;
use std::time::Duration;

use quickdraw_protocol::{ContestantView, ParticipantId, RoomCode, RoomSnapshot, RoundStatus};
use tokio::time::Instant;

use crate::RoomError;

/// One contestant in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contestant {
    pub id: ParticipantId,
    pub name: String,
    /// Time from round start to this contestant's accepted signal.
    pub elapsed: Option<Duration>,
}

impl Contestant {
    /// The wire view of this contestant.
    pub fn view(&self) -> ContestantView {
        ContestantView {
            id: self.id,
            name: self.name.clone(),
            elapsed_ms: self.elapsed.map(|d| d.as_millis() as u64),
        }
    }
}

/// The state of one room.
#[derive(Debug)]
pub struct Room {
    pub(crate) code: RoomCode,
    pub(crate) host: ParticipantId,
    /// Keyed by id so display order is stable.
    pub(crate) contestants: BTreeMap<ParticipantId, Contestant>,
    pub(crate) status: RoundStatus,
    pub(crate) round_start: Option<Instant>,
    pub(crate) arrivals: Vec<ParticipantId>,
}

impl Room {
    /// A fresh, idle room with no contestants.
    pub fn new(code: RoomCode, host: ParticipantId) -> Self {
        Self {
            code,
            host,
            contestants: BTreeMap::new(),
            status: RoundStatus::Idle,
            round_start: None,
            arrivals: Vec::new(),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> ParticipantId {
        self.host
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn round_start(&self) -> Option<Instant> {
        self.round_start
    }

    /// Contestants who signalled this round, in rank order.
    pub fn arrivals(&self) -> &[ParticipantId] {
        &self.arrivals
    }

    pub fn contestant(&self, id: ParticipantId) -> Option<&Contestant> {
        self.contestants.get(&id)
    }

    pub fn contestant_count(&self) -> usize {
        self.contestants.len()
    }

    /// Rank of a contestant in the current round, if it has signalled.
    pub fn rank_of(&self, id: ParticipantId) -> Option<u32> {
        self.arrivals
            .iter()
            .position(|&p| p == id)
            .map(|i| i as u32 + 1)
    }

    /// Makes `id` the host and returns the previous host.
    ///
    /// A contestant taking over as host stops being a contestant; its
    /// arrival, if any, goes with it.
    pub fn set_host(&mut self, id: ParticipantId) -> ParticipantId {
        self.remove_contestant(id);
        std::mem::replace(&mut self.host, id)
    }

    /// Adds a contestant, or renames an existing one.
    ///
    /// Renaming keeps the contestant's signal for this round. Joining is
    /// allowed in any round state; someone who joins mid-round can still
    /// signal in it.
    ///
    /// Returns the contestant and whether it is new.
    ///
    /// # Errors
    /// [`RoomError::HostCannotCompete`] if `id` is the host.
    pub fn upsert_contestant(
        &mut self,
        id: ParticipantId,
        name: String,
    ) -> Result<(&Contestant, bool), RoomError> {
        if id == self.host {
            return Err(RoomError::HostCannotCompete(self.code.clone()));
        }
        let mut is_new = false;
        let contestant = self.contestants.entry(id).or_insert_with(|| {
            is_new = true;
            Contestant {
                id,
                name: String::new(),
                elapsed: None,
            }
        });
        contestant.name = name;
        Ok((contestant, is_new))
    }

    /// Removes a contestant along with its arrival record.
    pub fn remove_contestant(&mut self, id: ParticipantId) -> Option<Contestant> {
        let removed = self.contestants.remove(&id)?;
        self.arrivals.retain(|&p| p != id);
        Some(removed)
    }

    /// Builds the externally visible view of the room.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            status: self.status,
            host: self.host,
            contestants: self.contestants.values().map(Contestant::view).collect(),
            arrivals: self
                .arrivals
                .iter()
                .filter_map(|id| self.contestants.get(id))
                .map(Contestant::view)
                .collect(),
        }
    }

    /// Forgets every signal of the current round.
    pub(crate) fn clear_arrivals(&mut self) {
        self.arrivals.clear();
        for contestant in self.contestants.values_mut() {
            contestant.elapsed = None;
        }
    }

    /// Panics if any room invariant is broken. Test helper.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut seen = std::collections::HashSet::new();
        for id in &self.arrivals {
            assert!(seen.insert(*id), "duplicate arrival {id}");
            assert!(self.contestants.contains_key(id), "arrival {id} is not a contestant");
        }
        assert!(self.arrivals.len() <= self.contestants.len());
        for (id, c) in &self.contestants {
            assert_eq!(
                c.elapsed.is_some(),
                self.arrivals.contains(id),
                "elapsed/arrivals disagree for {id}"
            );
        }
        if self.status == RoundStatus::Active {
            assert!(self.round_start.is_some(), "active round without a start");
        }
    }
}

/// Trims a display name and checks its length.
///
/// # Errors
/// [`RoomError::InvalidName`] if the trimmed name is empty or longer than
/// `max_chars` characters.
pub fn validate_name(raw: &str, max_chars: usize) -> Result<String, RoomError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(RoomError::InvalidName("name must not be empty".into()));
    }
    if name.chars().count() > max_chars {
        return Err(RoomError::InvalidName(format!(
            "name must be at most {max_chars} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> ParticipantId {
        ParticipantId(id)
    }

    fn room() -> Room {
        Room::new(RoomCode::parse("K7F2QX").unwrap(), pid(1))
    }

    #[test]
    fn test_new_room_is_idle_and_empty() {
        let room = room();
        assert_eq!(room.status(), RoundStatus::Idle);
        assert_eq!(room.host(), pid(1));
        assert_eq!(room.contestant_count(), 0);
        assert!(room.round_start().is_none());
        room.assert_invariants();
    }

    #[test]
    fn test_upsert_contestant_adds_then_renames() {
        let mut room = room();
        let (c, is_new) = room.upsert_contestant(pid(2), "Mona".into()).unwrap();
        assert!(is_new);
        assert_eq!(c.name, "Mona");
        assert!(c.elapsed.is_none());

        let (c, is_new) = room.upsert_contestant(pid(2), "Mona L.".into()).unwrap();
        assert!(!is_new);
        assert_eq!(c.name, "Mona L.");
        assert_eq!(room.contestant_count(), 1);
    }

    #[test]
    fn test_upsert_contestant_rejects_host() {
        let mut room = room();
        assert!(matches!(
            room.upsert_contestant(pid(1), "Boss".into()),
            Err(RoomError::HostCannotCompete(_))
        ));
        assert_eq!(room.contestant_count(), 0);
    }

    #[test]
    fn test_remove_contestant_drops_arrival() {
        let mut room = room();
        room.upsert_contestant(pid(2), "Mona".into()).unwrap();
        room.upsert_contestant(pid(3), "Ravi".into()).unwrap();
        room.arrivals = vec![pid(2), pid(3)];
        room.contestants.get_mut(&pid(2)).unwrap().elapsed = Some(Duration::from_millis(5));
        room.contestants.get_mut(&pid(3)).unwrap().elapsed = Some(Duration::from_millis(9));

        let removed = room.remove_contestant(pid(2)).unwrap();
        assert_eq!(removed.name, "Mona");
        assert_eq!(room.arrivals(), &[pid(3)]);
        assert_eq!(room.rank_of(pid(3)), Some(1));
        room.assert_invariants();
    }

    #[test]
    fn test_set_host_demotes_contestant_record() {
        let mut room = room();
        room.upsert_contestant(pid(2), "Mona".into()).unwrap();

        let previous = room.set_host(pid(2));
        assert_eq!(previous, pid(1));
        assert_eq!(room.host(), pid(2));
        assert!(room.contestant(pid(2)).is_none());
    }

    #[test]
    fn test_snapshot_orders_contestants_by_id_and_arrivals_by_rank() {
        let mut room = room();
        room.upsert_contestant(pid(9), "Zed".into()).unwrap();
        room.upsert_contestant(pid(4), "Ann".into()).unwrap();
        room.arrivals = vec![pid(9), pid(4)];
        room.contestants.get_mut(&pid(9)).unwrap().elapsed = Some(Duration::from_millis(83));
        room.contestants.get_mut(&pid(4)).unwrap().elapsed = Some(Duration::from_millis(140));

        let snap = room.snapshot();
        let ids: Vec<_> = snap.contestants.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![pid(4), pid(9)]);
        let names: Vec<_> = snap.arrivals.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Ann"]);
        assert_eq!(snap.arrivals[0].elapsed_ms, Some(83));
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Mona  ", 20).unwrap(), "Mona");
    }

    #[test]
    fn test_validate_name_rejects_blank() {
        assert!(matches!(validate_name("   ", 20), Err(RoomError::InvalidName(_))));
        assert!(matches!(validate_name("", 20), Err(RoomError::InvalidName(_))));
    }

    #[test]
    fn test_validate_name_counts_characters_not_bytes() {
        // 20 multi-byte characters are fine, 21 are not.
        let twenty = "é".repeat(20);
        assert_eq!(validate_name(&twenty, 20).unwrap(), twenty);
        assert!(validate_name(&"é".repeat(21), 20).is_err());
    }
}
