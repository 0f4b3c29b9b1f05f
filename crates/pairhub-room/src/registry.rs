//! The room registry: every room on the server, keyed by [`RoomKey`].
//!
//! # Locking
//!
//! Rooms live in a sharded `DashMap`, each behind its own async mutex.
//! A shard guard is never held across an `.await`: lookups clone the
//! room's `Arc` and drop the guard before locking the room. When both
//! are needed (eviction), the order is room mutex first, then shard.
//!
//! # Close timer
//!
//! A room where nobody is connected gets a close timer. The timer task
//! sleeps for the grace period, re-locks the room and evicts it only if
//! it is still the pending timer (same generation) and the room still
//! has no live connection. Join and reconnect abort the timer, so
//! whichever side wins the room lock decides the outcome.

use std::sync::Arc;

use dashmap::DashMap;
use pairhub_games::{Color, GameEvent, GameSnapshot, Reply};
use pairhub_protocol::{AccountRef, ConnectionId, PlayerId, Role, RoomKey};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::room::PendingClose;
use crate::{Room, RoomConfig, RoomError, RoomInfo};

type RoomSlot = Arc<Mutex<Room>>;
type RoomMap = DashMap<RoomKey, RoomSlot>;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened on a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room_key: RoomKey,
    pub role: Role,
    pub color: Option<Color>,
    /// The identity was already in the room; only its connection moved.
    pub rejoined: bool,
    /// This join filled the second seat and started the game.
    pub started_now: bool,
    /// Every live connection in the room after the join, the caller
    /// included. These receive `StartGame` when `started_now` is set.
    pub members: Vec<ConnectionId>,
}

/// What the reconnecting client needs to redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectOutcome {
    pub room_key: RoomKey,
    pub role: Role,
    pub color: Option<Color>,
    /// `None` if the game hasn't started yet.
    pub game: Option<GameSnapshot>,
}

/// One room affected by a dropped connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectNotice {
    pub room_key: RoomKey,
    /// Identities that were bound to the dropped connection.
    pub player_ids: Vec<PlayerId>,
    /// Connections still live in the room, to be told about it.
    pub remaining: Vec<ConnectionId>,
    /// Nobody is left; the close timer is running.
    pub close_scheduled: bool,
}

/// Where a game command's result should go.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Send to every listed connection (all live room members).
    Broadcast {
        event: GameEvent,
        targets: Vec<ConnectionId>,
    },
    /// Send only to the caller.
    Caller(GameEvent),
    /// Nothing to send.
    Ignored,
}

// ---------------------------------------------------------------------------
// RoomRegistry
// ---------------------------------------------------------------------------

/// Process-wide map of rooms. Cheap to share behind an `Arc`; every
/// method takes `&self`.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Arc<RoomMap>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates an empty room. Returns `false` if the key is taken; the
    /// existing room is not touched.
    ///
    /// The new room has nobody in it, so its close timer starts right
    /// away and the first join cancels it.
    pub async fn create_room(&self, game_type: &str, room_code: &str) -> bool {
        use dashmap::mapref::entry::Entry;

        let key = RoomKey::new(game_type, room_code);
        let slot = match self.rooms.entry(key.clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(entry) => {
                let slot = Arc::new(Mutex::new(Room::new(key.clone())));
                entry.insert(Arc::clone(&slot));
                slot
            }
        };
        tracing::info!(room_key = %key, "room created");

        let mut room = slot.lock().await;
        if !room.closed && !room.has_live_connection() && room.pending_close.is_none() {
            self.schedule_close(&mut room, &slot);
        }
        true
    }

    pub fn room_exists(&self, game_type: &str, room_code: &str) -> bool {
        self.rooms.contains_key(&RoomKey::new(game_type, room_code))
    }

    /// Seats `player_id` in the room, creating the room if needed.
    ///
    /// A known identity only has its connection rebound. A new identity
    /// takes a free seat or becomes a spectator. The second player
    /// starts the game. Any pending close is cancelled.
    ///
    /// # Errors
    /// - [`RoomError::UnknownGameType`] when starting the game fails
    /// - [`RoomError::RoomFull`] when the spectator cap is reached
    pub async fn join(
        &self,
        game_type: &str,
        room_code: &str,
        player_id: PlayerId,
        connection_id: ConnectionId,
        account: Option<AccountRef>,
    ) -> Result<JoinOutcome, RoomError> {
        let key = RoomKey::new(game_type, room_code);
        loop {
            let slot = self.slot_or_create(&key);
            let mut room = slot.lock().await;
            if room.closed {
                // Lost a race with eviction; drop the dead entry and retry.
                drop(room);
                self.rooms.remove_if(&key, |_, v| Arc::ptr_eq(v, &slot));
                continue;
            }

            let admission = room.admit(
                player_id.clone(),
                connection_id,
                account.clone(),
                self.config.max_spectators,
            )?;
            room.cancel_close();

            tracing::info!(
                room_key = %key,
                %player_id,
                conn_id = %connection_id,
                role = %admission.role,
                rejoined = admission.rejoined,
                "player joined"
            );
            if admission.started_now {
                tracing::info!(room_key = %key, "game started");
            }

            return Ok(JoinOutcome {
                room_key: key,
                role: admission.role,
                color: admission.color,
                rejoined: admission.rejoined,
                started_now: admission.started_now,
                members: room.live_connections(),
            });
        }
    }

    /// Rebinds a known identity to a new connection.
    ///
    /// # Errors
    /// [`RoomError::UnauthorizedReconnect`] if the room doesn't exist or
    /// never saw this identity. Nothing is modified in that case.
    pub async fn reconnect(
        &self,
        game_type: &str,
        room_code: &str,
        player_id: PlayerId,
        connection_id: ConnectionId,
    ) -> Result<ReconnectOutcome, RoomError> {
        let key = RoomKey::new(game_type, room_code);
        let unauthorized = |key: RoomKey, player_id: PlayerId| {
            RoomError::UnauthorizedReconnect {
                room_key: key,
                player_id,
            }
        };

        let Some(slot) = self.slot(&key) else {
            return Err(unauthorized(key, player_id));
        };
        let mut room = slot.lock().await;
        if room.closed {
            return Err(unauthorized(key, player_id));
        }
        let Some((role, color)) = room.role_of(&player_id) else {
            return Err(unauthorized(key, player_id));
        };

        room.rebind(&player_id, connection_id);
        room.cancel_close();
        tracing::info!(
            room_key = %key,
            %player_id,
            conn_id = %connection_id,
            "player reconnected"
        );

        Ok(ReconnectOutcome {
            room_key: key,
            role,
            color,
            game: room.snapshot(),
        })
    }

    /// Unbinds `connection_id` everywhere. Rooms left with no live
    /// connection get a close timer.
    pub async fn on_disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> Vec<DisconnectNotice> {
        let mut notices = Vec::new();
        for slot in self.all_slots() {
            let mut room = slot.lock().await;
            if room.closed {
                continue;
            }
            let player_ids = room.unbind(connection_id);
            if player_ids.is_empty() {
                continue;
            }

            let close_scheduled = !room.has_live_connection();
            if close_scheduled {
                self.schedule_close(&mut room, &slot);
            }
            tracing::info!(
                room_key = %room.key(),
                conn_id = %connection_id,
                players = ?player_ids,
                close_scheduled,
                "player disconnected"
            );
            notices.push(DisconnectNotice {
                room_key: room.key().clone(),
                player_ids,
                remaining: room.live_connections(),
                close_scheduled,
            });
        }
        notices
    }

    /// Routes a text command from `player_id` into the room's game.
    ///
    /// Commands from an identity not bound to `connection_id`, commands
    /// before the game starts, and anything a game rejects all come back
    /// as [`Dispatch::Ignored`].
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room doesn't exist.
    pub async fn handle_command(
        &self,
        game_type: &str,
        room_code: &str,
        player_id: &PlayerId,
        connection_id: ConnectionId,
        command: &str,
    ) -> Result<Dispatch, RoomError> {
        let key = RoomKey::new(game_type, room_code);
        let slot = self.slot(&key).ok_or_else(|| RoomError::NotFound(key.clone()))?;
        let mut room = slot.lock().await;
        if room.closed {
            return Err(RoomError::NotFound(key));
        }

        let dispatch = match room.command(player_id, connection_id, command) {
            Some(Reply::Broadcast(event)) => Dispatch::Broadcast {
                event,
                targets: room.live_connections(),
            },
            Some(Reply::Caller(event)) => Dispatch::Caller(event),
            Some(Reply::Ignored) => {
                tracing::debug!(room_key = %key, %player_id, command, "command ignored");
                Dispatch::Ignored
            }
            None => {
                tracing::debug!(
                    room_key = %key,
                    %player_id,
                    conn_id = %connection_id,
                    "command from unbound identity or before start"
                );
                Dispatch::Ignored
            }
        };
        Ok(dispatch)
    }

    /// Cancels every close timer and drops every room. Returns how many
    /// rooms were drained.
    pub async fn shutdown(&self) -> usize {
        let slots = self.all_slots();
        self.rooms.clear();
        for slot in &slots {
            let mut room = slot.lock().await;
            room.cancel_close();
            room.closed = true;
        }
        tracing::info!(rooms = slots.len(), "room registry drained");
        slots.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub async fn room_info(
        &self,
        game_type: &str,
        room_code: &str,
    ) -> Option<RoomInfo> {
        let slot = self.slot(&RoomKey::new(game_type, room_code))?;
        let room = slot.lock().await;
        (!room.closed).then(|| room.info())
    }

    // -- internals ---------------------------------------------------------

    fn slot(&self, key: &RoomKey) -> Option<RoomSlot> {
        self.rooms.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn slot_or_create(&self, key: &RoomKey) -> RoomSlot {
        let entry = self.rooms.entry(key.clone()).or_insert_with(|| {
            tracing::info!(room_key = %key, "room created");
            Arc::new(Mutex::new(Room::new(key.clone())))
        });
        Arc::clone(entry.value())
    }

    fn all_slots(&self) -> Vec<RoomSlot> {
        self.rooms
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Arms (or re-arms) the close timer. Caller holds the room lock.
    fn schedule_close(&self, room: &mut Room, slot: &RoomSlot) {
        room.close_generation += 1;
        let generation = room.close_generation;
        let deadline = Instant::now() + self.config.reconnect_grace;
        let rooms = Arc::clone(&self.rooms);
        let slot = Arc::clone(slot);
        let key = room.key().clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let mut room = slot.lock().await;
            let current = room
                .pending_close
                .as_ref()
                .is_some_and(|p| p.generation == generation);
            if !current || room.closed || room.has_live_connection() {
                return;
            }
            room.pending_close = None;
            room.closed = true;
            rooms.remove_if(&key, |_, v| Arc::ptr_eq(v, &slot));
            tracing::info!(room_key = %key, "room evicted after grace period");
        });

        let previous = room.pending_close.replace(PendingClose {
            generation,
            deadline,
            handle,
        });
        if let Some(previous) = previous {
            previous.handle.abort();
        }
        tracing::debug!(
            room_key = %room.key(),
            grace_secs = self.config.reconnect_grace.as_secs(),
            "close timer armed"
        );
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
