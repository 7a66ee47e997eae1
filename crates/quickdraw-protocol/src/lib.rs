//! Wire protocol for Quickdraw.
//!
//! - **Types** ([`Envelope`], [`ClientCommand`], [`ServerEvent`],
//!   [`RoomSnapshot`]) — the messages that travel on the wire.
//! - **Room codes** ([`RoomCode`]) — the six-character room names.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — bytes ⇄ messages.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Session/Room (commands)
//! ```

mod code;
mod codec;
mod error;
mod types;

pub use code::RoomCode;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientCommand, ContestantView, Envelope, ParticipantId, Payload, RoomSnapshot,
    RoundStatus, ServerEvent,
};
