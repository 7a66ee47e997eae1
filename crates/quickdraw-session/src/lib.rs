//! Connection sessions for Quickdraw.
//!
//! A session is the server's record of one live connection and, at most,
//! the one room it is bound to and in which role. The room layer decides
//! *whether* a participant may do something; this crate only remembers
//! *where* each participant is so commands can be routed and so
//! everything can be unwound when a connection or a room goes away.
//!
//! ```text
//! Room Layer (above)     ← receives commands routed by binding
//!     ↕
//! Session Layer (this)   ← participant → (room code, role)
//!     ↕
//! Protocol Layer (below) ← ParticipantId, RoomCode
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Binding, Role, Session};
