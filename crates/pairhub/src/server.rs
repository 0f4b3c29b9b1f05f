//! `PairhubServer` builder and server loop.
//!
//! This is the entry point for running a pairhub server. It ties
//! together all the layers: transport → protocol → session → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use pairhub_protocol::{Codec, HubEvent, JsonCodec};
use pairhub_room::{RoomConfig, RoomRegistry};
use pairhub_session::{Authenticator, SessionManager};
use pairhub_transport::{Transport, WebSocketTransport};
use tokio::task::JoinSet;

use crate::handler::handle_connection;
use crate::{PairhubError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The room
/// registry and session manager synchronize internally, so no outer
/// lock is needed.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) rooms: RoomRegistry,
    pub(crate) sessions: SessionManager,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
    pub(crate) started: Instant,
}

impl<A: Authenticator, C: Codec> ServerState<A, C> {
    /// Milliseconds since the server started, for envelope timestamps.
    pub(crate) fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting a pairhub server.
///
/// # Example
///
/// ```rust,no_run
/// use pairhub::prelude::*;
///
/// # async fn run() -> Result<(), PairhubError> {
/// let server = PairhubServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(AnonymousAuthenticator)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PairhubServerBuilder {
    config: ServerConfig,
}

impl PairhubServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration (grace period, spectator cap).
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    /// Binds the listener and builds the server with the given
    /// authenticator, using `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<PairhubServer<A, JsonCodec>, PairhubError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: RoomRegistry::new(self.config.room.clone()),
            sessions: SessionManager::with_capacity(self.config.outbound_capacity),
            auth,
            codec: JsonCodec,
            config: self.config,
            started: Instant::now(),
        });

        Ok(PairhubServer { transport, state })
    }
}

impl Default for PairhubServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound pairhub server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct PairhubServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl PairhubServer<pairhub_session::AnonymousAuthenticator, JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> PairhubServerBuilder {
        PairhubServerBuilder::new()
    }
}

impl<A, C> PairhubServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), PairhubError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then tells every
    /// client `ServerShutdown`, closes their connections and drains the
    /// room registry.
    ///
    /// Returns once every connection task has flushed and finished, or
    /// after [`ServerConfig::shutdown_timeout`], whichever comes first.
    /// Tasks still running then are aborted.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), PairhubError> {
        tracing::info!(
            addr = %self.transport.local_addr().map_or_else(|e| e.to_string(), |a| a.to_string()),
            "pairhub server running"
        );
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                // Reap finished connections so the set doesn't grow.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        let clients = self.state.sessions.drain(&HubEvent::ServerShutdown);
        let rooms = self.state.rooms.shutdown().await;

        let flushed = tokio::time::timeout(self.state.config.shutdown_timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if flushed.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                "connections did not finish in time, aborting"
            );
            connections.shutdown().await;
        }

        tracing::info!(clients, rooms, "pairhub server stopped");
        Ok(())
    }
}
