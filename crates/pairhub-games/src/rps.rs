//! Best-of-five rock-paper-scissors.
//!
//! Commands: `CHOOSE:<rock|paper|scissors>`, `RESET` (mutual vote) and
//! `getState`. A drawn round is replayed without advancing the round
//! counter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ByColor, Color, GameEvent, Reply};

/// Round wins that end the match early.
pub const WINS_NEEDED: u8 = 3;

/// Decisive rounds after which the match is scored.
pub const MAX_ROUNDS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    /// Returns `true` if `self` defeats `other`.
    pub fn beats(self, other: Choice) -> bool {
        matches!(
            (self, other),
            (Self::Rock, Self::Scissors)
                | (Self::Scissors, Self::Paper)
                | (Self::Paper, Self::Rock)
        )
    }
}

impl FromStr for Choice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("rock") {
            Ok(Self::Rock)
        } else if s.eq_ignore_ascii_case("paper") {
            Ok(Self::Paper)
        } else if s.eq_ignore_ascii_case("scissors") {
            Ok(Self::Scissors)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rock => write!(f, "rock"),
            Self::Paper => write!(f, "paper"),
            Self::Scissors => write!(f, "scissors"),
        }
    }
}

/// Final result of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Red,
    Yellow,
    Draw,
}

impl From<Color> for MatchOutcome {
    fn from(color: Color) -> Self {
        match color {
            Color::Red => Self::Red,
            Color::Yellow => Self::Yellow,
        }
    }
}

/// One decisive round. Drawn rounds are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round: u32,
    pub red_choice: Choice,
    pub yellow_choice: Choice,
    pub winner: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpsSnapshot {
    /// Decisive rounds played so far.
    pub round: u32,
    pub scores: ByColor<u8>,
    pub red_chosen: bool,
    pub yellow_chosen: bool,
    pub last_round_draw: bool,
    pub history: Vec<RoundRecord>,
    pub winner: Option<MatchOutcome>,
    pub reset_votes: ByColor<bool>,
}

enum Command {
    Choose(Choice),
    Reset,
    GetState,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("RESET") {
            return Some(Self::Reset);
        }
        if input.eq_ignore_ascii_case("getState") {
            return Some(Self::GetState);
        }
        let (verb, arg) = input.split_once(':')?;
        if !verb.trim().eq_ignore_ascii_case("CHOOSE") {
            return None;
        }
        arg.parse().ok().map(Self::Choose)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RockPaperScissors {
    choices: ByColor<Option<Choice>>,
    wins: ByColor<u8>,
    round: u32,
    history: Vec<RoundRecord>,
    last_round_draw: bool,
    reset_votes: ByColor<bool>,
    result: Option<MatchOutcome>,
}

impl RockPaperScissors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> Option<MatchOutcome> {
        self.result
    }

    pub fn snapshot(&self) -> RpsSnapshot {
        RpsSnapshot {
            round: self.round,
            scores: self.wins,
            red_chosen: self.choices.red.is_some(),
            yellow_chosen: self.choices.yellow.is_some(),
            last_round_draw: self.last_round_draw,
            history: self.history.clone(),
            winner: self.result,
            reset_votes: self.reset_votes,
        }
    }

    pub(crate) fn apply(&mut self, color: Color, input: &str) -> Reply {
        match Command::parse(input) {
            Some(Command::Choose(choice)) => {
                if self.choose(color, choice) {
                    Reply::Broadcast(GameEvent::ReceiveRpsState(self.snapshot()))
                } else {
                    Reply::Ignored
                }
            }
            Some(Command::Reset) => self.vote_reset(color),
            Some(Command::GetState) => {
                Reply::Caller(GameEvent::ReceiveRpsState(self.snapshot()))
            }
            None => Reply::Ignored,
        }
    }

    pub(crate) fn observe(&self, input: &str) -> Reply {
        match Command::parse(input) {
            Some(Command::GetState) => {
                Reply::Caller(GameEvent::ReceiveRpsState(self.snapshot()))
            }
            _ => Reply::Ignored,
        }
    }

    fn choose(&mut self, color: Color, choice: Choice) -> bool {
        if self.result.is_some() || self.choices[color].is_some() {
            return false;
        }
        self.choices[color] = Some(choice);

        let (Some(red), Some(yellow)) = (self.choices.red, self.choices.yellow)
        else {
            return true;
        };
        self.choices = ByColor::default();

        if red == yellow {
            self.last_round_draw = true;
            return true;
        }
        self.last_round_draw = false;
        self.round += 1;
        let winner = if red.beats(yellow) {
            Color::Red
        } else {
            Color::Yellow
        };
        self.wins[winner] += 1;
        self.history.push(RoundRecord {
            round: self.round,
            red_choice: red,
            yellow_choice: yellow,
            winner,
        });
        self.result = self.evaluate();
        if let Some(result) = self.result {
            tracing::debug!(?result, round = self.round, "rps match over");
        }
        true
    }

    fn evaluate(&self) -> Option<MatchOutcome> {
        if let Some(color) =
            Color::ALL.into_iter().find(|&c| self.wins[c] >= WINS_NEEDED)
        {
            return Some(color.into());
        }
        if self.round < MAX_ROUNDS {
            return None;
        }
        Some(match self.wins.red.cmp(&self.wins.yellow) {
            std::cmp::Ordering::Greater => MatchOutcome::Red,
            std::cmp::Ordering::Less => MatchOutcome::Yellow,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        })
    }

    fn vote_reset(&mut self, color: Color) -> Reply {
        if self.reset_votes[color] {
            return Reply::Ignored;
        }
        self.reset_votes[color] = true;
        if !self.reset_votes.both() {
            return Reply::Ignored;
        }
        *self = Self::new();
        Reply::Broadcast(GameEvent::RpsReset(self.snapshot()))
    }
}
