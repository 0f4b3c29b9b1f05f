//! Wire protocol for pairhub.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Envelope`], [`HubRequest`], [`HubEvent`], [`RoomKey`], ...)
//!   — the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes and text frames.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer sits between transport (text frames) and the room
//! layer. It knows nothing about connections or rooms beyond their names.
//!
//! ```text
//! Transport (text) → Protocol (Envelope) → Room registry
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AccountRef, ConnectionId, Envelope, HubEvent, HubRequest, PROTOCOL_VERSION,
    Payload, PlayerId, Role, RoomKey, error_code,
};
