//! # Pairhub
//!
//! Two-player room server for turn-based web games.
//!
//! Clients connect over WebSocket, handshake, then create or join rooms
//! addressed by a game type and a short room code. The first two
//! identities in a room take the Red and Yellow seats and everyone after
//! watches. The server owns the game state for Connect Four, pair
//! matching and rock-paper-scissors, and pushes every change to the
//! room. A player who drops keeps their seat until the room has been
//! empty for the reconnect grace period.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pairhub::prelude::*;
//!
//! # async fn run() -> Result<(), PairhubError> {
//! let config = ServerConfig::from_env()?;
//! let server = PairhubServer::builder()
//!     .config(config)
//!     .build(AnonymousAuthenticator)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ENV_BIND, ENV_GRACE_SECS, ENV_IDLE_SECS, ServerConfig};
pub use error::PairhubError;
pub use server::{PairhubServer, PairhubServerBuilder};

/// Everything needed to run a server or write a client in one import.
pub mod prelude {
    pub use crate::{
        ConfigError, PairhubError, PairhubServer, PairhubServerBuilder,
        ServerConfig,
    };
    pub use pairhub_games::{Color, GameSnapshot, GameType};
    pub use pairhub_protocol::{
        AccountRef, ConnectionId, Envelope, HubEvent, HubRequest,
        PROTOCOL_VERSION, Payload, PlayerId, Role, RoomKey, error_code,
    };
    pub use pairhub_room::RoomConfig;
    pub use pairhub_session::{
        AnonymousAuthenticator, Authenticator, SessionError,
    };
}
