//! Room lifecycle management for pairhub.
//!
//! A room pairs two players (plus any number of spectators) under a
//! [`RoomKey`](pairhub_protocol::RoomKey) and owns one running game.
//! Seats survive disconnects: a room with nobody connected is only
//! evicted once its grace timer fires without anyone coming back.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — concurrent key → room map; every operation
//! - [`Room`] / [`RoomUser`] — seats, spectators, disconnect bookkeeping
//! - [`RoomConfig`] — grace period and spectator cap
//! - [`JoinOutcome`], [`ReconnectOutcome`], [`DisconnectNotice`],
//!   [`Dispatch`] — what the gateway should tell whom

mod config;
mod error;
mod registry;
mod room;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use registry::{
    DisconnectNotice, Dispatch, JoinOutcome, ReconnectOutcome, RoomRegistry,
};
pub use room::{Admission, Room, RoomInfo, RoomUser};
