//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The server only ever talks to a [`Codec`]; swapping JSON for a binary
//! format means adding an implementation here and nothing else.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what browser clients speak natively, and the transport sends
/// UTF-8 output as text frames.
///
/// ```rust
/// use greenvest_protocol::{ClientEnvelope, ClientEvent, Codec, JsonCodec, RoomCode};
///
/// let codec = JsonCodec;
/// let frame = br#"{"ack":1,"event":{"type":"startGame","roomCode":"4821"}}"#;
///
/// let envelope: ClientEnvelope = codec.decode(frame).unwrap();
/// assert_eq!(envelope.ack, Some(1));
/// assert_eq!(
///     envelope.event,
///     ClientEvent::StartGame { room_code: RoomCode::from("4821") },
/// );
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
