//! The closed set of game engines and the single command entry point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    Color, ConnectFour, ConnectFourSnapshot, GameError, PairMatching,
    PairMatchingSnapshot, RockPaperScissors, RpsSnapshot,
};

// ---------------------------------------------------------------------------
// GameType
// ---------------------------------------------------------------------------

/// Which engine a room runs, identified on the wire by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "four-in-a-row")]
    ConnectFour,
    #[serde(rename = "pair-matching")]
    PairMatching,
    #[serde(rename = "rock-paper-scissors")]
    RockPaperScissors,
}

impl GameType {
    /// The wire name used in room keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConnectFour => "four-in-a-row",
            Self::PairMatching => "pair-matching",
            Self::RockPaperScissors => "rock-paper-scissors",
        }
    }
}

impl FromStr for GameType {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "four-in-a-row" => Ok(Self::ConnectFour),
            "pair-matching" => Ok(Self::PairMatching),
            "rock-paper-scissors" => Ok(Self::RockPaperScissors),
            other => Err(GameError::UnknownGameType(other.to_string())),
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Events and replies
// ---------------------------------------------------------------------------

/// A state update produced by an engine, named after the client-side
/// handler that consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// ConnectFour: a move landed.
    ReceiveMove(ConnectFourSnapshot),
    /// ConnectFour: the board was cleared.
    GameReset(ConnectFourSnapshot),
    /// PairMatching: board snapshot after a flip or on request.
    ReceiveBoard(PairMatchingSnapshot),
    /// PairMatching: both players agreed to a fresh board.
    ResetGame(PairMatchingSnapshot),
    /// RockPaperScissors: match state after a choice or on request.
    ReceiveRpsState(RpsSnapshot),
    /// RockPaperScissors: both players agreed to a new match.
    RpsReset(RpsSnapshot),
}

/// Where an engine wants its event delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send to every connection in the room.
    Broadcast(GameEvent),
    /// Send only to the connection that issued the command.
    Caller(GameEvent),
    /// The command changed nothing; send nothing.
    Ignored,
}

impl Reply {
    /// Returns `true` if the command was dropped.
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

/// Full state of whichever engine a room runs, for redraw after reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gameType", content = "state")]
pub enum GameSnapshot {
    #[serde(rename = "four-in-a-row")]
    ConnectFour(ConnectFourSnapshot),
    #[serde(rename = "pair-matching")]
    PairMatching(PairMatchingSnapshot),
    #[serde(rename = "rock-paper-scissors")]
    RockPaperScissors(RpsSnapshot),
}

// ---------------------------------------------------------------------------
// GameInstance
// ---------------------------------------------------------------------------

/// One running game.
#[derive(Debug, Clone)]
pub enum GameInstance {
    ConnectFour(ConnectFour),
    PairMatching(PairMatching),
    RockPaperScissors(RockPaperScissors),
}

impl GameInstance {
    /// Starts a fresh game of the given type.
    pub fn new(game_type: GameType) -> Self {
        match game_type {
            GameType::ConnectFour => Self::ConnectFour(ConnectFour::new()),
            GameType::PairMatching => Self::PairMatching(PairMatching::new()),
            GameType::RockPaperScissors => {
                Self::RockPaperScissors(RockPaperScissors::new())
            }
        }
    }

    /// Starts a fresh game from a wire game type name.
    ///
    /// # Errors
    /// [`GameError::UnknownGameType`] if no engine has that name.
    pub fn from_type_name(name: &str) -> Result<Self, GameError> {
        name.parse().map(Self::new)
    }

    pub fn game_type(&self) -> GameType {
        match self {
            Self::ConnectFour(_) => GameType::ConnectFour,
            Self::PairMatching(_) => GameType::PairMatching,
            Self::RockPaperScissors(_) => GameType::RockPaperScissors,
        }
    }

    /// Applies a command from the active player playing `color`.
    pub fn apply(&mut self, color: Color, command: &str) -> Reply {
        let reply = match self {
            Self::ConnectFour(game) => game.apply(color, command),
            Self::PairMatching(game) => game.apply(color, command),
            Self::RockPaperScissors(game) => game.apply(color, command),
        };
        if reply.is_ignored() {
            tracing::debug!(
                game = %self.game_type(),
                %color,
                command,
                "command ignored"
            );
        }
        reply
    }

    /// Answers a read-only request from someone without a seat.
    ///
    /// Only snapshot requests are honored; anything that would mutate
    /// state comes back [`Reply::Ignored`].
    pub fn observe(&self, command: &str) -> Reply {
        match self {
            Self::ConnectFour(_) => Reply::Ignored,
            Self::PairMatching(game) => game.observe(command),
            Self::RockPaperScissors(game) => game.observe(command),
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        match self {
            Self::ConnectFour(game) => GameSnapshot::ConnectFour(game.snapshot()),
            Self::PairMatching(game) => {
                GameSnapshot::PairMatching(game.snapshot())
            }
            Self::RockPaperScissors(game) => {
                GameSnapshot::RockPaperScissors(game.snapshot())
            }
        }
    }

    /// Returns `true` once a winner or match result is set.
    pub fn is_finished(&self) -> bool {
        match self {
            Self::ConnectFour(game) => game.winner().is_some(),
            Self::PairMatching(game) => game.winner().is_some(),
            Self::RockPaperScissors(game) => game.result().is_some(),
        }
    }
}
