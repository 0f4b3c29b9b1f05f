//! Error types for the game layer.

/// Errors raised while setting up a game.
///
/// Gameplay itself has no error path; only picking an engine can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No engine is registered under this game type name.
    #[error("unknown game type: {0}")]
    UnknownGameType(String),
}
