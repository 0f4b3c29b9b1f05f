//! Unified error type for pairhub.

use pairhub_protocol::ProtocolError;
use pairhub_room::RoomError;
use pairhub_session::SessionError;
use pairhub_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PairhubError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, handshake rules).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, unknown connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (unknown game type, unauthorized reconnect).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use pairhub_protocol::RoomKey;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let pairhub_err: PairhubError = err.into();
        assert!(matches!(pairhub_err, PairhubError::Transport(_)));
        assert!(pairhub_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let pairhub_err: PairhubError = err.into();
        assert!(matches!(pairhub_err, PairhubError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AuthFailed("nope".into());
        let pairhub_err: PairhubError = err.into();
        assert!(matches!(pairhub_err, PairhubError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomKey::new("four-in-a-row", "x"));
        let pairhub_err: PairhubError = err.into();
        assert!(matches!(pairhub_err, PairhubError::Room(_)));
        assert_eq!(pairhub_err.to_string(), "room four-in-a-row:X not found");
    }
}
