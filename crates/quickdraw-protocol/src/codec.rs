//! Codecs: how envelopes become bytes and back.
//!
//! The server is written against the [`Codec`] trait and never calls a
//! serializer directly, so swapping JSON for a binary format touches
//! nothing outside this module.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// Shared by every connection task, hence `Send + Sync + 'static`.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or have
    /// the wrong shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON via `serde_json`.
///
/// Browsers can produce and consume it with `JSON.stringify`/`JSON.parse`,
/// which is all a buzzer page needs.
///
/// ```rust
/// use quickdraw_protocol::{ClientCommand, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::command(1, 5000, ClientCommand::Signal);
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientCommand, Envelope, Payload};

    #[test]
    fn test_json_codec_decodes_browser_style_text() {
        let raw = br#"{"seq":2,"timestamp":0,"payload":{"type":"Command","data":{"type":"JoinRoom","code":"k7f2qx","name":"  Mona "}}}"#;
        let env: Envelope = JsonCodec.decode(raw).unwrap();
        assert_eq!(
            env.payload,
            Payload::Command(ClientCommand::JoinRoom {
                code: "k7f2qx".into(),
                name: "  Mona ".into(),
            })
        );
    }

    #[test]
    fn test_json_codec_garbage_is_decode_error() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_output_is_utf8() {
        let bytes = JsonCodec
            .encode(&Envelope::command(0, 0, ClientCommand::CreateRoom))
            .unwrap();
        assert!(std::str::from_utf8(&bytes).is_ok());
    }
}
