//! # Quickdraw
//!
//! A real-time "race to respond" buzzer server.
//!
//! A host opens a room and gets a six-character code. Contestants join
//! with the code and a display name. The host starts a round, everyone
//! races to signal, and the server ranks them in the exact order their
//! signals reached the room, with the time since the round opened.
//!
//! The server speaks JSON envelopes over WebSocket. Each room runs as its
//! own task, so ranking is decided by one writer and never by a race.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quickdraw::prelude::*;
//!
//! # async fn run() -> Result<(), QuickdrawError> {
//! let server = QuickdrawServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::QuickdrawError;
pub use server::{PROTOCOL_VERSION, QuickdrawServer, QuickdrawServerBuilder};

pub mod prelude {
    pub use crate::{
        PROTOCOL_VERSION, QuickdrawError, QuickdrawServer, QuickdrawServerBuilder, ServerConfig,
    };
    pub use quickdraw_protocol::{
        ClientCommand, Envelope, ParticipantId, Payload, RoomCode, RoomSnapshot, RoundStatus,
        ServerEvent,
    };
    pub use quickdraw_room::RoomConfig;
}
