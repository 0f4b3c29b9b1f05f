//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The gateway doesn't care how messages are serialized; it only needs
//! something that implements [`Codec`]. [`JsonCodec`] is the one shipped
//! here, since browser clients speak JSON text frames.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` so one codec can be shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Encodes into a string for a text frame.
    ///
    /// # Errors
    /// Fails like [`Codec::encode`], or with
    /// `ProtocolError::InvalidMessage` if the codec's output isn't UTF-8.
    fn encode_text<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        String::from_utf8(self.encode(value)?).map_err(|_| {
            ProtocolError::InvalidMessage("codec produced non-UTF-8 output".into())
        })
    }

    /// Decodes the contents of a text frame.
    ///
    /// # Errors
    /// Fails like [`Codec::decode`].
    fn decode_text<T: DeserializeOwned>(
        &self,
        text: &str,
    ) -> Result<T, ProtocolError> {
        self.decode(text.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use pairhub_protocol::{Codec, Envelope, HubRequest, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::request(1, 5000, HubRequest::Heartbeat { client_time: 5000 });
///
/// let text = codec.encode_text(&envelope).unwrap();
/// let decoded: Envelope = codec.decode_text(&text).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    // serde_json always emits UTF-8, so skip the re-validation.
    fn encode_text<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}
