//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating
/// messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not a valid message: malformed JSON, an unknown
    /// `method`, or missing fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but breaks a protocol rule, e.g. a malformed
    /// room key or a request sent before the handshake.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The client announced a protocol version this server does not speak.
    #[error("unsupported protocol version {got} (expected {expected})")]
    UnsupportedVersion { expected: u32, got: u32 },
}
