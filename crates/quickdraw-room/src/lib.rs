//! Rooms for Quickdraw: who is in them, the round they share, and who
//! signalled first.
//!
//! Each room runs as its own Tokio task (actor model). Everything that
//! touches a room goes through its [`RoomHandle`], so the room's state is
//! only ever changed by one task and signals are ranked strictly in the
//! order the actor sees them.
//!
//! # Key types
//!
//! - [`Coordinator`]: entry point for the server; owns the registry and
//!   the session table
//! - [`RoomRegistry`]: live rooms by code, code generation
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the room record, round state machine and arbitration
//! - [`RoomConfig`]: per-room settings

mod arbitration;
mod broadcast;
mod config;
mod coordinator;
mod error;
mod registry;
mod room;
mod round;
mod state;

pub use arbitration::{Arrival, Rejection};
pub use broadcast::{Members, Outbox};
pub use config::RoomConfig;
pub use coordinator::Coordinator;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Departure, RoomHandle};
pub use round::RoundAction;
pub use state::{Contestant, Room, validate_name};
