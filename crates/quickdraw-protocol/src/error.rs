//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not a well-formed message of the expected shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code that cannot name any room: wrong length or a
    /// character outside the code alphabet.
    #[error("malformed room code {0:?}")]
    InvalidRoomCode(String),

    /// The message decoded fine but breaks a protocol rule, such as a
    /// command arriving before the handshake.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
