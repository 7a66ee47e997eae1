//! Signal arbitration: who was first.
//!
//! Ranks come from the length of the arrival list at the moment a signal
//! is accepted, so they are dense (1, 2, 3, ...) and never reused within
//! a round. This is only correct because a room's signals are applied
//! one at a time by its actor; [`Room::signal`] itself takes no locks.

use std::time::Duration;

use quickdraw_protocol::ParticipantId;
use tokio::time::Instant;

use crate::Room;

/// An accepted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub participant: ParticipantId,
    /// 1-based position in this round.
    pub rank: u32,
    /// Time since the round started.
    pub elapsed: Duration,
}

/// Why a signal was not ranked. None of these are reported to anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The round is idle or stopped.
    RoundNotActive,
    /// The sender is not a contestant in this room (e.g. the host).
    NotContestant,
    /// The contestant already has a rank this round. Usually a double tap.
    AlreadySignalled,
}

impl Room {
    /// Ranks a signal from `by` received at `now`.
    ///
    /// # Errors
    /// Returns the [`Rejection`] reason when the signal does not count.
    /// The room is left untouched.
    pub fn signal(&mut self, by: ParticipantId, now: Instant) -> Result<Arrival, Rejection> {
        if !self.status.accepts_signals() {
            return Err(Rejection::RoundNotActive);
        }
        let start = self.round_start.ok_or(Rejection::RoundNotActive)?;
        let contestant = self
            .contestants
            .get_mut(&by)
            .ok_or(Rejection::NotContestant)?;
        if contestant.elapsed.is_some() {
            return Err(Rejection::AlreadySignalled);
        }

        let elapsed = now.saturating_duration_since(start);
        contestant.elapsed = Some(elapsed);
        self.arrivals.push(by);

        Ok(Arrival {
            participant: by,
            rank: self.arrivals.len() as u32,
            elapsed,
        })
    }
}
