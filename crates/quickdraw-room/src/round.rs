//! The round state machine.
//!
//! ```text
//!            start                stop
//!   Idle ───────────→ Active ───────────→ Stopped
//!    ↑                  │                    │
//!    │      reset       │       start        │
//!    ├──────────────────┘  Active ←──────────┤
//!    │                        reset          │
//!    └───────────────────────────────────────┘
//! ```
//!
//! Only the host may drive it. Starting always begins a fresh race:
//! the previous round's arrivals are wiped before anyone can signal.

use std::fmt;

use quickdraw_protocol::{ParticipantId, RoundStatus};
use tokio::time::Instant;

use crate::{Room, RoomError};

/// A host command that moves the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAction {
    Start,
    Stop,
    Reset,
}

impl RoundAction {
    /// The state `action` leads to from `from`, or `None` if the
    /// transition is not allowed.
    pub fn apply(self, from: RoundStatus) -> Option<RoundStatus> {
        match (self, from) {
            (Self::Start, RoundStatus::Idle | RoundStatus::Stopped) => Some(RoundStatus::Active),
            (Self::Stop, RoundStatus::Active) => Some(RoundStatus::Stopped),
            (Self::Reset, _) => Some(RoundStatus::Idle),
            _ => None,
        }
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Start => "start the round",
            Self::Stop => "stop the round",
            Self::Reset => "reset the round",
        }
    }
}

impl fmt::Display for RoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

impl Room {
    /// Applies a round transition on behalf of `by` at time `now`.
    ///
    /// Returns the new status.
    ///
    /// # Errors
    /// - [`RoomError::Unauthorized`] if `by` is not the host.
    /// - [`RoomError::InvalidTransition`] if `action` is not allowed from
    ///   the current status. Nothing changes in either case.
    pub fn apply_round(
        &mut self,
        by: ParticipantId,
        action: RoundAction,
        now: Instant,
    ) -> Result<RoundStatus, RoomError> {
        if by != self.host {
            return Err(RoomError::Unauthorized {
                participant: by,
                code: self.code.clone(),
                action: action.describe(),
            });
        }
        let next = action.apply(self.status).ok_or(RoomError::InvalidTransition {
            action,
            status: self.status,
        })?;

        match action {
            RoundAction::Start => {
                self.clear_arrivals();
                self.round_start = Some(now);
            }
            // Stopping only closes the door; who got in stays visible.
            RoundAction::Stop => {}
            RoundAction::Reset => {
                self.clear_arrivals();
                self.round_start = None;
            }
        }
        self.status = next;
        Ok(next)
    }

    pub fn start_round(&mut self, by: ParticipantId, now: Instant) -> Result<RoundStatus, RoomError> {
        self.apply_round(by, RoundAction::Start, now)
    }

    pub fn stop_round(&mut self, by: ParticipantId, now: Instant) -> Result<RoundStatus, RoomError> {
        self.apply_round(by, RoundAction::Stop, now)
    }

    pub fn reset_round(&mut self, by: ParticipantId, now: Instant) -> Result<RoundStatus, RoomError> {
        self.apply_round(by, RoundAction::Reset, now)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quickdraw_protocol::RoomCode;

    use super::*;

    const HOST: ParticipantId = ParticipantId(1);

    fn room_with(contestants: &[(u64, &str)]) -> Room {
        let mut room = Room::new(RoomCode::parse("K7F2QX").unwrap(), HOST);
        for &(id, name) in contestants {
            room.upsert_contestant(ParticipantId(id), name.into()).unwrap();
        }
        room
    }

    #[test]
    fn test_apply_transition_table() {
        use RoundAction::*;
        use RoundStatus::*;

        assert_eq!(Start.apply(Idle), Some(Active));
        assert_eq!(Start.apply(Stopped), Some(Active));
        assert_eq!(Start.apply(Active), None);
        assert_eq!(Stop.apply(Active), Some(Stopped));
        assert_eq!(Stop.apply(Idle), None);
        assert_eq!(Stop.apply(Stopped), None);
        for from in [Idle, Active, Stopped] {
            assert_eq!(Reset.apply(from), Some(Idle));
        }
    }

    #[test]
    fn test_start_round_sets_start_and_activates() {
        let mut room = room_with(&[]);
        let now = Instant::now();
        assert_eq!(room.start_round(HOST, now).unwrap(), RoundStatus::Active);
        assert_eq!(room.round_start(), Some(now));
        room.assert_invariants();
    }

    #[test]
    fn test_start_round_from_stopped_clears_previous_arrivals() {
        let mut room = room_with(&[(2, "Mona"), (3, "Ravi")]);
        let t0 = Instant::now();
        room.start_round(HOST, t0).unwrap();
        room.signal(ParticipantId(2), t0 + Duration::from_millis(50)).unwrap();
        room.stop_round(HOST, t0).unwrap();
        assert_eq!(room.arrivals().len(), 1);

        let t1 = t0 + Duration::from_secs(5);
        room.start_round(HOST, t1).unwrap();

        assert!(room.arrivals().is_empty());
        assert!(room.contestant(ParticipantId(2)).unwrap().elapsed.is_none());
        assert_eq!(room.round_start(), Some(t1));
        room.assert_invariants();
    }

    #[test]
    fn test_stop_round_keeps_arrivals_and_start() {
        let mut room = room_with(&[(2, "Mona")]);
        let t0 = Instant::now();
        room.start_round(HOST, t0).unwrap();
        room.signal(ParticipantId(2), t0 + Duration::from_millis(10)).unwrap();

        assert_eq!(room.stop_round(HOST, t0).unwrap(), RoundStatus::Stopped);
        assert_eq!(room.arrivals(), &[ParticipantId(2)]);
        assert_eq!(room.round_start(), Some(t0));
        room.assert_invariants();
    }

    #[test]
    fn test_reset_round_clears_everything() {
        let mut room = room_with(&[(2, "Mona")]);
        let t0 = Instant::now();
        room.start_round(HOST, t0).unwrap();
        room.signal(ParticipantId(2), t0).unwrap();

        assert_eq!(room.reset_round(HOST, t0).unwrap(), RoundStatus::Idle);
        assert!(room.arrivals().is_empty());
        assert!(room.round_start().is_none());
        assert!(room.contestant(ParticipantId(2)).unwrap().elapsed.is_none());
        room.assert_invariants();
    }

    #[test]
    fn test_reset_from_idle_is_allowed() {
        let mut room = room_with(&[]);
        assert_eq!(room.reset_round(HOST, Instant::now()).unwrap(), RoundStatus::Idle);
    }

    #[test]
    fn test_non_host_cannot_drive_round() {
        let mut room = room_with(&[(2, "Mona")]);
        let err = room.start_round(ParticipantId(2), Instant::now()).unwrap_err();
        assert!(matches!(err, RoomError::Unauthorized { participant, .. } if participant == ParticipantId(2)));
        assert_eq!(room.status(), RoundStatus::Idle);
    }

    #[test]
    fn test_illegal_transition_changes_nothing() {
        let mut room = room_with(&[]);
        let err = room.stop_round(HOST, Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            RoomError::InvalidTransition {
                action: RoundAction::Stop,
                status: RoundStatus::Idle
            }
        ));
        assert_eq!(room.status(), RoundStatus::Idle);

        let t0 = Instant::now();
        room.start_round(HOST, t0).unwrap();
        assert!(room.start_round(HOST, t0 + Duration::from_secs(1)).is_err());
        assert_eq!(room.round_start(), Some(t0), "a refused start keeps the old zero point");
    }
}
