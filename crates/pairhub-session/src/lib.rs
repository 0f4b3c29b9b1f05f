//! Connection sessions for pairhub.
//!
//! This crate handles the per-connection side of the server:
//!
//! 1. **Authentication** — turning a handshake token into an optional
//!    account ([`Authenticator`] trait)
//! 2. **Session tracking** — knowing which connections are live and how
//!    to reach them ([`SessionManager`])
//!
//! Player identity inside a room is not a session concern: a
//! [`PlayerId`](pairhub_protocol::PlayerId) is chosen by the client and
//! survives reconnects, while a session lives exactly as long as one
//! socket.
//!
//! ```text
//! Room layer (above)     ← resolves rooms to connection ids
//!     ↕
//! Session layer (this)   ← connection id → outbound channel
//!     ↕
//! Protocol layer (below) ← HubEvent, ConnectionId, AccountRef
//! ```

mod auth;
mod error;
mod manager;

pub use auth::{AnonymousAuthenticator, Authenticator};
pub use error::SessionError;
pub use manager::{DEFAULT_OUTBOUND_CAPACITY, Session, SessionManager};
