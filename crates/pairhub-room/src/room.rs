//! A single room: seats, spectators, the game, and the close timer slot.
//!
//! `Room` is plain data guarded by the registry's per-room mutex. Nothing
//! in here awaits; the registry does the locking and timer spawning.

use std::collections::HashMap;

use pairhub_games::{Color, GameInstance, GameSnapshot};
use pairhub_protocol::{AccountRef, ConnectionId, PlayerId, Role, RoomKey};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{RoomError, RoomState};

/// Seats per room. Seat 0 plays red, seat 1 yellow.
pub(crate) const SEATS: usize = Color::ALL.len();

/// One identity known to a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomUser {
    pub player_id: PlayerId,
    pub is_active_player: bool,
    pub account: Option<AccountRef>,
    /// `None` while disconnected. The only field that changes across
    /// reconnects.
    pub connection_id: Option<ConnectionId>,
}

impl RoomUser {
    pub fn is_connected(&self) -> bool {
        self.connection_id.is_some()
    }
}

/// Result of seating an identity in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub role: Role,
    pub color: Option<Color>,
    /// The identity was already known and only had its connection rebound.
    pub rejoined: bool,
    /// This admission created the game. True for exactly one admission
    /// per room.
    pub started_now: bool,
}

/// Read-only summary for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_key: RoomKey,
    pub state: RoomState,
    pub players: Vec<PlayerId>,
    pub spectators: Vec<PlayerId>,
    pub live_connections: usize,
    pub disconnected: Vec<PlayerId>,
    pub close_deadline: Option<Instant>,
}

/// A scheduled eviction. Superseded or cancelled timers are recognized
/// by their generation.
#[derive(Debug)]
pub(crate) struct PendingClose {
    pub(crate) generation: u64,
    pub(crate) deadline: Instant,
    pub(crate) handle: JoinHandle<()>,
}

#[derive(Debug)]
pub struct Room {
    key: RoomKey,
    game: Option<GameInstance>,
    /// Active players in seat order.
    players: Vec<RoomUser>,
    spectators: Vec<RoomUser>,
    disconnected: HashMap<PlayerId, Instant>,
    pub(crate) pending_close: Option<PendingClose>,
    pub(crate) close_generation: u64,
    /// Set once the room has been evicted or drained. A closed room is
    /// never mutated again.
    pub(crate) closed: bool,
}

impl Room {
    pub fn new(key: RoomKey) -> Self {
        Self {
            key,
            game: None,
            players: Vec::with_capacity(SEATS),
            spectators: Vec::new(),
            disconnected: HashMap::new(),
            pending_close: None,
            close_generation: 0,
            closed: false,
        }
    }

    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    pub fn state(&self) -> RoomState {
        match &self.game {
            None => RoomState::WaitingForPlayers,
            Some(game) if game.is_finished() => RoomState::Finished,
            Some(_) => RoomState::InProgress,
        }
    }

    pub fn game(&self) -> Option<&GameInstance> {
        self.game.as_ref()
    }

    pub fn snapshot(&self) -> Option<GameSnapshot> {
        self.game.as_ref().map(GameInstance::snapshot)
    }

    /// Seats `player_id` on `connection_id`.
    ///
    /// A known identity just has its connection rebound. A new identity
    /// takes the next free seat, or becomes a spectator once both seats
    /// are taken. Filling the last seat builds the game.
    ///
    /// # Errors
    /// - [`RoomError::UnknownGameType`] if the game can't be built; the
    ///   room is not modified
    /// - [`RoomError::RoomFull`] if the spectator cap is reached
    pub fn admit(
        &mut self,
        player_id: PlayerId,
        connection_id: ConnectionId,
        account: Option<AccountRef>,
        max_spectators: Option<usize>,
    ) -> Result<Admission, RoomError> {
        if let Some((role, color)) = self.role_of(&player_id) {
            self.rebind(&player_id, connection_id);
            return Ok(Admission {
                role,
                color,
                rejoined: true,
                started_now: false,
            });
        }

        let user = RoomUser {
            player_id,
            is_active_player: false,
            account,
            connection_id: Some(connection_id),
        };

        if self.players.len() < SEATS {
            let seat = self.players.len();
            let game = if seat + 1 == SEATS && self.game.is_none() {
                Some(GameInstance::from_type_name(self.key.game_type())?)
            } else {
                None
            };
            let started_now = game.is_some();
            if started_now {
                self.game = game;
            }
            self.players.push(RoomUser {
                is_active_player: true,
                ..user
            });
            return Ok(Admission {
                role: Role::Player,
                color: Color::from_seat(seat),
                rejoined: false,
                started_now,
            });
        }

        if max_spectators.is_some_and(|cap| self.spectators.len() >= cap) {
            return Err(RoomError::RoomFull(self.key.clone()));
        }
        self.spectators.push(user);
        Ok(Admission {
            role: Role::Spectator,
            color: None,
            rejoined: false,
            started_now: false,
        })
    }

    /// Role and (for players) color of a known identity.
    pub fn role_of(&self, player_id: &PlayerId) -> Option<(Role, Option<Color>)> {
        if let Some(seat) =
            self.players.iter().position(|u| &u.player_id == player_id)
        {
            return Some((Role::Player, Color::from_seat(seat)));
        }
        self.spectators
            .iter()
            .any(|u| &u.player_id == player_id)
            .then_some((Role::Spectator, None))
    }

    pub fn user(&self, player_id: &PlayerId) -> Option<&RoomUser> {
        self.users().find(|u| &u.player_id == player_id)
    }

    /// Points a known identity at a new connection and clears its
    /// disconnect record. Returns `false` for unknown identities.
    pub fn rebind(
        &mut self,
        player_id: &PlayerId,
        connection_id: ConnectionId,
    ) -> bool {
        let Some(user) = self.users_mut().find(|u| &u.player_id == player_id)
        else {
            return false;
        };
        user.connection_id = Some(connection_id);
        self.disconnected.remove(player_id);
        true
    }

    /// Unbinds every user on `connection_id` and records when they left.
    /// Returns the identities that were unbound.
    pub fn unbind(&mut self, connection_id: ConnectionId) -> Vec<PlayerId> {
        let now = Instant::now();
        let mut gone = Vec::new();
        for user in self
            .players
            .iter_mut()
            .chain(self.spectators.iter_mut())
            .filter(|u| u.connection_id == Some(connection_id))
        {
            user.connection_id = None;
            gone.push(user.player_id.clone());
        }
        for player_id in &gone {
            self.disconnected.insert(player_id.clone(), now);
        }
        gone
    }

    /// Connections currently bound to any user, players first.
    pub fn live_connections(&self) -> Vec<ConnectionId> {
        self.users().filter_map(|u| u.connection_id).collect()
    }

    pub fn has_live_connection(&self) -> bool {
        self.users().any(RoomUser::is_connected)
    }

    /// When `player_id` was last seen disconnecting, if it's still away.
    pub fn disconnected_since(&self, player_id: &PlayerId) -> Option<Instant> {
        self.disconnected.get(player_id).copied()
    }

    /// Routes a command from a bound identity into the game.
    ///
    /// Players act with their seat color; spectators only get read-only
    /// snapshot requests answered. Returns `None` if the caller isn't
    /// bound to `connection_id` or no game is running.
    pub(crate) fn command(
        &mut self,
        player_id: &PlayerId,
        connection_id: ConnectionId,
        command: &str,
    ) -> Option<pairhub_games::Reply> {
        let user = self.user(player_id)?;
        if user.connection_id != Some(connection_id) {
            return None;
        }
        let (role, color) = self.role_of(player_id)?;
        let game = self.game.as_mut()?;
        Some(match (role, color) {
            (Role::Player, Some(color)) => game.apply(color, command),
            _ => game.observe(command),
        })
    }

    pub fn info(&self) -> RoomInfo {
        let ids = |users: &[RoomUser]| {
            users.iter().map(|u| u.player_id.clone()).collect::<Vec<_>>()
        };
        let mut disconnected: Vec<PlayerId> =
            self.disconnected.keys().cloned().collect();
        disconnected.sort();
        RoomInfo {
            room_key: self.key.clone(),
            state: self.state(),
            players: ids(&self.players),
            spectators: ids(&self.spectators),
            live_connections: self.live_connections().len(),
            disconnected,
            close_deadline: self.pending_close.as_ref().map(|p| p.deadline),
        }
    }

    /// Aborts the pending close timer, if any.
    pub(crate) fn cancel_close(&mut self) -> bool {
        match self.pending_close.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    fn users(&self) -> impl Iterator<Item = &RoomUser> {
        self.players.iter().chain(self.spectators.iter())
    }

    fn users_mut(&mut self) -> impl Iterator<Item = &mut RoomUser> {
        self.players.iter_mut().chain(self.spectators.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use pairhub_games::{GameEvent, Reply};

    use super::*;

    fn room(game_type: &str) -> Room {
        Room::new(RoomKey::new(game_type, "t1"))
    }

    fn cid(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    #[test]
    fn test_admit_seats_two_players_then_spectators() {
        let mut room = room("four-in-a-row");

        let first = room.admit(pid("a"), cid(1), None, None).unwrap();
        assert_eq!((first.role, first.color), (Role::Player, Some(Color::Red)));
        assert!(!first.started_now);
        assert_eq!(room.state(), RoomState::WaitingForPlayers);

        let second = room.admit(pid("b"), cid(2), None, None).unwrap();
        assert_eq!(second.color, Some(Color::Yellow));
        assert!(second.started_now);
        assert_eq!(room.state(), RoomState::InProgress);

        let third = room.admit(pid("c"), cid(3), None, None).unwrap();
        assert_eq!((third.role, third.color), (Role::Spectator, None));
        assert!(!third.started_now);
        assert_eq!(room.live_connections(), vec![cid(1), cid(2), cid(3)]);
    }

    #[test]
    fn test_admit_known_identity_rebinds_only() {
        let mut room = room("four-in-a-row");
        room.admit(pid("a"), cid(1), Some(AccountRef("acc".into())), None)
            .unwrap();
        room.admit(pid("b"), cid(2), None, None).unwrap();

        let again = room.admit(pid("a"), cid(7), None, None).unwrap();

        assert!(again.rejoined);
        assert!(!again.started_now);
        assert_eq!(again.color, Some(Color::Red));
        let user = room.user(&pid("a")).unwrap();
        assert_eq!(user.connection_id, Some(cid(7)));
        assert_eq!(user.account, Some(AccountRef("acc".into())));
        assert_eq!(room.info().players.len(), 2);
    }

    #[test]
    fn test_admit_unknown_game_type_leaves_room_untouched() {
        let mut room = room("chess");
        room.admit(pid("a"), cid(1), None, None).unwrap();
        let before = room.info();

        let err = room.admit(pid("b"), cid(2), None, None).unwrap_err();

        assert_eq!(err, RoomError::UnknownGameType("chess".into()));
        assert_eq!(room.info(), before);
        assert!(room.game().is_none());
    }

    #[test]
    fn test_admit_respects_spectator_cap() {
        let mut room = room("rock-paper-scissors");
        room.admit(pid("a"), cid(1), None, None).unwrap();
        room.admit(pid("b"), cid(2), None, None).unwrap();
        room.admit(pid("c"), cid(3), None, Some(1)).unwrap();

        let err = room.admit(pid("d"), cid(4), None, Some(1)).unwrap_err();

        assert!(matches!(err, RoomError::RoomFull(_)));
    }

    #[test]
    fn test_unbind_records_disconnect_and_keeps_seat() {
        let mut room = room("four-in-a-row");
        room.admit(pid("a"), cid(1), None, None).unwrap();
        room.admit(pid("b"), cid(2), None, None).unwrap();

        let gone = room.unbind(cid(1));

        assert_eq!(gone, vec![pid("a")]);
        assert!(room.disconnected_since(&pid("a")).is_some());
        assert!(room.has_live_connection());
        assert_eq!(room.role_of(&pid("a")), Some((Role::Player, Some(Color::Red))));

        room.unbind(cid(2));
        assert!(!room.has_live_connection());

        assert!(room.rebind(&pid("a"), cid(5)));
        assert!(room.disconnected_since(&pid("a")).is_none());
        assert!(!room.rebind(&pid("zz"), cid(6)));
    }

    #[test]
    fn test_command_requires_bound_connection() {
        let mut room = room("four-in-a-row");
        room.admit(pid("a"), cid(1), None, None).unwrap();
        room.admit(pid("b"), cid(2), None, None).unwrap();

        assert_eq!(room.command(&pid("a"), cid(2), "MOVE:0"), None);
        assert_eq!(room.command(&pid("nobody"), cid(1), "MOVE:0"), None);
        let reply = room.command(&pid("a"), cid(1), "MOVE:0").unwrap();
        assert!(matches!(reply, Reply::Broadcast(GameEvent::ReceiveMove(_))));
    }

    #[test]
    fn test_command_before_start_is_none() {
        let mut room = room("four-in-a-row");
        room.admit(pid("a"), cid(1), None, None).unwrap();
        assert_eq!(room.command(&pid("a"), cid(1), "MOVE:0"), None);
    }

    #[test]
    fn test_command_from_spectator_is_read_only() {
        let mut room = room("pair-matching");
        room.admit(pid("a"), cid(1), None, None).unwrap();
        room.admit(pid("b"), cid(2), None, None).unwrap();
        room.admit(pid("c"), cid(3), None, None).unwrap();

        let flip = room.command(&pid("c"), cid(3), "flip 0 0").unwrap();
        assert!(flip.is_ignored());
        let board = room.command(&pid("c"), cid(3), "getBoard").unwrap();
        assert!(matches!(board, Reply::Caller(GameEvent::ReceiveBoard(_))));
    }
}
