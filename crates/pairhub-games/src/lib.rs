//! Two-player game engines for pairhub.
//!
//! Every engine is a plain state machine driven by short text commands
//! from an untrusted client. Engines never fail on bad input: a command
//! that is malformed, out of turn, or out of range comes back as
//! [`Reply::Ignored`] and leaves the state untouched.
//!
//! # Key types
//!
//! - [`GameInstance`] — closed set of engines, one `apply` entry point
//! - [`GameType`] — the wire name of each engine
//! - [`Color`] — seat color; the first player is red, the second yellow
//! - [`Reply`] / [`GameEvent`] — what an engine wants delivered, and to whom

mod color;
mod connect_four;
mod error;
mod instance;
mod pair_matching;
mod rps;

pub use color::{ByColor, Color};
pub use connect_four::{ConnectFour, ConnectFourSnapshot};
pub use error::GameError;
pub use instance::{GameEvent, GameInstance, GameSnapshot, GameType, Reply};
pub use pair_matching::{
    Card, CardState, Layout, PairMatching, PairMatchingSnapshot, Position,
};
pub use rps::{
    Choice, MatchOutcome, RockPaperScissors, RoundRecord, RpsSnapshot,
};
