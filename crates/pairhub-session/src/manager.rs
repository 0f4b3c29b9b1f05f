//! The session manager: every live connection and how to reach it.
//!
//! Each connection handler registers itself after the handshake and gets
//! back the receiving half of a bounded channel. Its writer task drains
//! that channel onto the socket, so anyone holding a [`ConnectionId`]
//! can deliver a [`HubEvent`] without touching the socket or awaiting
//! network I/O.
//!
//! A client that stops reading while events keep arriving fills its
//! queue. Sends never wait on it: the session is dropped instead, which
//! closes the writer and with it the socket.
//!
//! # Concurrency note
//!
//! Backed by a sharded `DashMap`, so handlers on different threads can
//! register, remove and send concurrently. Sends never await; no shard
//! guard is held across an `.await`.

use std::time::Instant;

use dashmap::DashMap;
use pairhub_protocol::{AccountRef, ConnectionId, HubEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::SessionError;

/// Outbound events buffered per connection before it counts as stalled.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// The server's record of one live connection.
#[derive(Debug)]
pub struct Session {
    pub connection_id: ConnectionId,

    /// Set if the authenticator recognized an account.
    pub account: Option<AccountRef>,

    pub connected_at: Instant,

    outbound: mpsc::Sender<HubEvent>,
}

/// Registry of live connections, keyed by [`ConnectionId`].
///
/// ```text
/// register() ──→ send_to() / fan_out() ──→ remove()
///                                      └─→ drain()   (shutdown)
/// ```
#[derive(Debug)]
pub struct SessionManager {
    sessions: DashMap<ConnectionId, Session>,
    capacity: usize,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Creates a manager whose connections each buffer at most
    /// `capacity` outbound events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Registers a freshly handshaken connection and returns the queue of
    /// events to write to it.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if the id is taken.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        account: Option<AccountRef>,
    ) -> Result<mpsc::Receiver<HubEvent>, SessionError> {
        use dashmap::mapref::entry::Entry;

        match self.sessions.entry(connection_id) {
            Entry::Occupied(_) => {
                Err(SessionError::AlreadyRegistered(connection_id))
            }
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(self.capacity);
                slot.insert(Session {
                    connection_id,
                    account,
                    connected_at: Instant::now(),
                    outbound: tx,
                });
                tracing::debug!(%connection_id, "session registered");
                Ok(rx)
            }
        }
    }

    /// Forgets a connection. Dropping the session closes its outbound
    /// channel, which ends the writer task once the queue is flushed.
    pub fn remove(&self, connection_id: ConnectionId) -> Option<Session> {
        let removed = self.sessions.remove(&connection_id).map(|(_, s)| s);
        if let Some(session) = &removed {
            tracing::debug!(
                %connection_id,
                alive_ms = session.connected_at.elapsed().as_millis() as u64,
                "session removed"
            );
        }
        removed
    }

    /// Queues one event for one connection.
    ///
    /// A connection whose queue is full is removed on the spot.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if the connection is not registered
    /// - [`SessionError::ChannelClosed`] if its writer already stopped
    /// - [`SessionError::QueueFull`] if it stopped reading
    pub fn send_to(
        &self,
        connection_id: ConnectionId,
        event: HubEvent,
    ) -> Result<(), SessionError> {
        let sent = self
            .sessions
            .get(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?
            .outbound
            .try_send(event);

        // The shard guard is gone by here; remove() takes it again.
        match sent {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => {
                Err(SessionError::ChannelClosed(connection_id))
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    %connection_id,
                    capacity = self.capacity,
                    "outbound queue full, dropping connection"
                );
                self.remove(connection_id);
                Err(SessionError::QueueFull(connection_id))
            }
        }
    }

    /// Queues a copy of `event` for each listed connection. Unknown,
    /// closed or stalled connections are skipped. Returns how many were
    /// reached.
    pub fn fan_out<'a>(
        &self,
        targets: impl IntoIterator<Item = &'a ConnectionId>,
        event: &HubEvent,
    ) -> usize {
        targets
            .into_iter()
            .filter(|&&id| match self.send_to(id, event.clone()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(connection_id = %id, error = %e, "fan-out skipped");
                    false
                }
            })
            .count()
    }

    /// Returns the account a connection authenticated as.
    pub fn account(&self, connection_id: ConnectionId) -> Option<AccountRef> {
        self.sessions
            .get(&connection_id)
            .and_then(|s| s.account.clone())
    }

    /// Sends `farewell` to every connection and forgets them all. A
    /// connection with a full queue is dropped without it. Returns how
    /// many sessions were dropped.
    pub fn drain(&self, farewell: &HubEvent) -> usize {
        let ids: Vec<ConnectionId> =
            self.sessions.iter().map(|entry| *entry.key()).collect();
        let mut drained = 0;
        for id in ids {
            if let Some(session) = self.remove(id) {
                let _ = session.outbound.try_send(farewell.clone());
                drained += 1;
            }
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
