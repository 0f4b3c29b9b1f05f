//! Error types for the room layer.

use pairhub_games::GameError;
use pairhub_protocol::{PlayerId, RoomKey};

/// Errors that can occur during room operations.
///
/// Bad game commands are not errors; engines ignore them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room's game type names no engine. Raised when the second
    /// player would start the game; the room is left as it was.
    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    /// Reconnect to a room that doesn't exist, or by an identity that
    /// was never seated there.
    #[error("player {player_id} cannot reconnect to room {room_key}")]
    UnauthorizedReconnect {
        room_key: RoomKey,
        player_id: PlayerId,
    },

    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomKey),

    /// Both seats are taken and the spectator cap is reached.
    #[error("room {0} is full")]
    RoomFull(RoomKey),
}

impl From<GameError> for RoomError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::UnknownGameType(name) => Self::UnknownGameType(name),
        }
    }
}
