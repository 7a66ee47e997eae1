//! Room actor: one Tokio task per room.
//!
//! The actor owns the [`Room`] and its [`Members`]. Everything that reads
//! or changes the room arrives as a [`RoomCommand`] on a bounded channel
//! and is handled to completion before the next one is looked at, so two
//! signals can never race for the same rank.
//!
//! After each change the actor sends, in order: the requester's own
//! confirmation (if any), the narrow event to all members, then a full
//! `State` snapshot to all members.

use quickdraw_protocol::{ContestantView, ParticipantId, RoomCode, RoomSnapshot, ServerEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::arbitration::{Arrival, Rejection};
use crate::{Members, Outbox, Room, RoomConfig, RoomError, RoundAction};

/// What a participant's departure meant for the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The current host left. The room has closed itself.
    HostLost,
    /// A contestant left; its record and arrival are gone.
    Contestant(ContestantView),
    /// A member with no role left (a host that was replaced).
    Observer,
    /// The participant was not in the room.
    NotMember,
}

type Reply<T> = oneshot::Sender<T>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    JoinAsHost {
        participant: ParticipantId,
        outbox: Outbox,
        reply: Reply<RoomSnapshot>,
    },
    Join {
        participant: ParticipantId,
        name: String,
        outbox: Outbox,
        reply: Reply<Result<ContestantView, RoomError>>,
    },
    Round {
        participant: ParticipantId,
        action: RoundAction,
        reply: Reply<Result<(), RoomError>>,
    },
    Signal {
        participant: ParticipantId,
        reply: Reply<Result<Arrival, Rejection>>,
    },
    RequestState {
        participant: ParticipantId,
        reply: Reply<Result<RoomSnapshot, RoomError>>,
    },
    Leave {
        participant: ParticipantId,
        reply: Reply<Departure>,
    },
    /// Close the room: notify everyone and stop.
    Shutdown { reason: String },
}

/// Handle to a running room actor.
///
/// Cheap to clone. The registry holds one per live room; callers clone it
/// out of the registry so they never hold the registry lock while waiting
/// on the room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns `true` if both handles talk to the same actor.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Makes `participant` the host. Returns the snapshot after the change.
    pub async fn join_as_host(
        &self,
        participant: ParticipantId,
        outbox: Outbox,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::JoinAsHost {
            participant,
            outbox,
            reply,
        })
        .await
    }

    /// Adds or renames a contestant. `name` must already be validated.
    pub async fn join(
        &self,
        participant: ParticipantId,
        name: String,
        outbox: Outbox,
    ) -> Result<ContestantView, RoomError> {
        self.request(|reply| RoomCommand::Join {
            participant,
            name,
            outbox,
            reply,
        })
        .await?
    }

    pub async fn round(
        &self,
        participant: ParticipantId,
        action: RoundAction,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Round {
            participant,
            action,
            reply,
        })
        .await?
    }

    /// Submits a signal. The inner result says whether it was ranked.
    pub async fn signal(
        &self,
        participant: ParticipantId,
    ) -> Result<Result<Arrival, Rejection>, RoomError> {
        self.request(|reply| RoomCommand::Signal { participant, reply })
            .await
    }

    /// Sends the current snapshot to `participant` and returns it.
    pub async fn request_state(
        &self,
        participant: ParticipantId,
    ) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::RequestState { participant, reply })
            .await?
    }

    pub async fn leave(&self, participant: ParticipantId) -> Result<Departure, RoomError> {
        self.request(|reply| RoomCommand::Leave { participant, reply })
            .await
    }

    /// Tells the room to close (fire-and-forget).
    pub async fn shutdown(&self, reason: impl Into<String>) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown {
                reason: reason.into(),
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Sends a command and waits for the actor's reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// Whether the actor loop keeps going after a command.
enum Flow {
    Continue,
    Close,
}

struct RoomActor {
    room: Room,
    members: Members,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), host = %self.room.host(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            if let Flow::Close = self.handle(cmd) {
                break;
            }
        }

        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::JoinAsHost {
                participant,
                outbox,
                reply,
            } => {
                let _ = reply.send(self.handle_join_as_host(participant, outbox));
            }
            RoomCommand::Join {
                participant,
                name,
                outbox,
                reply,
            } => {
                let _ = reply.send(self.handle_join(participant, name, outbox));
            }
            RoomCommand::Round {
                participant,
                action,
                reply,
            } => {
                let _ = reply.send(self.handle_round(participant, action));
            }
            RoomCommand::Signal { participant, reply } => {
                let _ = reply.send(self.handle_signal(participant));
            }
            RoomCommand::RequestState { participant, reply } => {
                let _ = reply.send(self.handle_request_state(participant));
            }
            RoomCommand::Leave { participant, reply } => {
                let departure = self.handle_leave(participant);
                if departure == Departure::HostLost {
                    // Members hear RoomClosed before the leaver's reply.
                    self.close("host disconnected");
                    let _ = reply.send(departure);
                    return Flow::Close;
                }
                let _ = reply.send(departure);
            }
            RoomCommand::Shutdown { reason } => {
                self.close(&reason);
                return Flow::Close;
            }
        }
        Flow::Continue
    }

    fn handle_join_as_host(&mut self, participant: ParticipantId, outbox: Outbox) -> RoomSnapshot {
        let demoted = self.room.contestant(participant).map(|c| c.view());
        let previous = self.room.set_host(participant);
        self.members.insert(participant, outbox);

        tracing::info!(
            room = %self.room.code(),
            host = %participant,
            %previous,
            "host joined"
        );

        self.members.send_to(
            participant,
            ServerEvent::HostJoined {
                code: self.room.code().clone(),
            },
        );
        if let Some(contestant) = demoted {
            self.members
                .broadcast(&ServerEvent::ContestantLeft { contestant });
        }
        self.broadcast_state()
    }

    fn handle_join(
        &mut self,
        participant: ParticipantId,
        name: String,
        outbox: Outbox,
    ) -> Result<ContestantView, RoomError> {
        let (contestant, is_new) = self.room.upsert_contestant(participant, name)?;
        let view = contestant.view();
        self.members.insert(participant, outbox);

        tracing::info!(
            room = %self.room.code(),
            %participant,
            name = %view.name,
            is_new,
            contestants = self.room.contestant_count(),
            "contestant joined"
        );

        self.members.send_to(
            participant,
            ServerEvent::Joined {
                code: self.room.code().clone(),
                contestant: view.clone(),
            },
        );
        self.members.broadcast(&ServerEvent::ContestantJoined {
            contestant: view.clone(),
        });
        self.broadcast_state();
        Ok(view)
    }

    fn handle_round(
        &mut self,
        participant: ParticipantId,
        action: RoundAction,
    ) -> Result<(), RoomError> {
        let status = self.room.apply_round(participant, action, Instant::now())?;
        tracing::info!(room = %self.room.code(), %action, %status, "round transition");

        let event = match action {
            RoundAction::Start => ServerEvent::RoundStarted,
            RoundAction::Stop => ServerEvent::RoundStopped,
            RoundAction::Reset => ServerEvent::RoundReset,
        };
        self.members.broadcast(&event);
        self.broadcast_state();
        Ok(())
    }

    fn handle_signal(&mut self, participant: ParticipantId) -> Result<Arrival, Rejection> {
        // Timestamp taken here, inside the serialized section, so elapsed
        // times never decrease with rank.
        let arrival = match self.room.signal(participant, Instant::now()) {
            Ok(arrival) => arrival,
            Err(reason) => {
                tracing::debug!(room = %self.room.code(), %participant, ?reason, "signal ignored");
                return Err(reason);
            }
        };

        let name = self
            .room
            .contestant(participant)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let elapsed_ms = arrival.elapsed.as_millis() as u64;
        tracing::info!(
            room = %self.room.code(),
            %participant,
            rank = arrival.rank,
            elapsed_ms,
            "signal accepted"
        );

        self.members.broadcast(&ServerEvent::SignalAccepted {
            contestant: participant,
            name,
            rank: arrival.rank,
            elapsed_ms,
        });
        self.broadcast_state();
        Ok(arrival)
    }

    fn handle_request_state(&self, participant: ParticipantId) -> Result<RoomSnapshot, RoomError> {
        if !self.members.contains(participant) {
            return Err(RoomError::Unauthorized {
                participant,
                code: self.room.code().clone(),
                action: "view the room",
            });
        }
        let snapshot = self.room.snapshot();
        self.members
            .send_to(participant, ServerEvent::State(snapshot.clone()));
        Ok(snapshot)
    }

    fn handle_leave(&mut self, participant: ParticipantId) -> Departure {
        if participant == self.room.host() {
            self.members.remove(participant);
            tracing::info!(room = %self.room.code(), host = %participant, "host lost");
            return Departure::HostLost;
        }
        if !self.members.remove(participant) {
            return Departure::NotMember;
        }
        let Some(removed) = self.room.remove_contestant(participant) else {
            tracing::debug!(room = %self.room.code(), %participant, "observer left");
            return Departure::Observer;
        };

        let view = removed.view();
        tracing::info!(
            room = %self.room.code(),
            %participant,
            contestants = self.room.contestant_count(),
            "contestant left"
        );
        self.members.broadcast(&ServerEvent::ContestantLeft {
            contestant: view.clone(),
        });
        self.broadcast_state();
        Departure::Contestant(view)
    }

    fn close(&mut self, reason: &str) {
        tracing::info!(room = %self.room.code(), %reason, "room closing");
        self.members.broadcast(&ServerEvent::RoomClosed {
            code: self.room.code().clone(),
            reason: reason.to_string(),
        });
        self.receiver.close();
    }

    fn broadcast_state(&self) -> RoomSnapshot {
        let snapshot = self.room.snapshot();
        self.members.broadcast(&ServerEvent::State(snapshot.clone()));
        snapshot
    }
}

/// Spawns the actor for a new room with `host` already bound, and sends
/// the host its `RoomCreated` and first `State`.
pub(crate) fn spawn_room(
    code: RoomCode,
    host: ParticipantId,
    outbox: Outbox,
    config: &RoomConfig,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer);

    let mut members = Members::new();
    members.insert(host, outbox);
    let actor = RoomActor {
        room: Room::new(code.clone(), host),
        members,
        receiver: rx,
    };

    actor
        .members
        .send_to(host, ServerEvent::RoomCreated { code: code.clone() });
    actor.broadcast_state();

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
