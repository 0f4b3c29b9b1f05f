//! Error types for the session layer.

use pairhub_protocol::ConnectionId;

/// Errors that can occur while authenticating or addressing a connection.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session is registered for this connection.
    #[error("no session for connection {0}")]
    NotFound(ConnectionId),

    /// A session is already registered under this connection id.
    #[error("connection {0} already has a session")]
    AlreadyRegistered(ConnectionId),

    /// The connection's writer has gone away; the event was dropped.
    #[error("outbound channel closed for connection {0}")]
    ChannelClosed(ConnectionId),

    /// The connection stopped reading and its outbound queue filled up.
    /// The session has been dropped.
    #[error("outbound queue full for connection {0}")]
    QueueFull(ConnectionId),
}
