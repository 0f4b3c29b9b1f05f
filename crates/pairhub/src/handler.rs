//! Per-connection handler: handshake, auth, and request routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version → authenticate token
//!   2. Register a session and spawn the writer task
//!   3. Send HandshakeAck
//!   4. Loop: receive envelopes → dispatch requests to the room registry
//!
//! Outbound events never go straight to the socket from here. They are
//! queued on the session's channel and the writer task stamps each with
//! a sequence number and timestamp, so events for one client stay in
//! order no matter which task produced them.

use std::sync::Arc;

use pairhub_protocol::{
    Codec, ConnectionId, Envelope, HubEvent, HubRequest, PROTOCOL_VERSION,
    Payload, ProtocolError, error_code,
};
use pairhub_room::{Dispatch, RoomError};
use pairhub_session::Authenticator;
use pairhub_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::PairhubError;
use crate::server::ServerState;

/// Drop guard that tears down a connection's session and room bindings
/// when the handler exits.
///
/// Since `Drop` is synchronous, the room cleanup runs in a spawned task.
struct ConnectionGuard<A: Authenticator, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<A, C>>,
}

impl<A: Authenticator, C: Codec> Drop for ConnectionGuard<A, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        state.sessions.remove(conn_id);
        tokio::spawn(async move {
            for notice in state.rooms.on_disconnect(conn_id).await {
                for player_id in notice.player_ids {
                    let event = HubEvent::PlayerDisconnected {
                        room_key: notice.room_key.clone(),
                        player_id,
                    };
                    state.sessions.fan_out(&notice.remaining, &event);
                }
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, C>>,
) -> Result<(), PairhubError>
where
    A: Authenticator,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Handshake ---
    let account = perform_handshake(&conn, &state).await?;
    tracing::info!(%conn_id, account = ?account, "client connected");

    // --- Step 2: Session + writer ---
    let outbound = state.sessions.register(conn_id, account)?;
    let guard = ConnectionGuard {
        conn_id,
        state: Arc::clone(&state),
    };
    let mut writer =
        tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), outbound));

    send(&state, conn_id, HubEvent::HandshakeAck {
        connection_id: conn_id,
    });

    // --- Step 3: Request loop ---
    // Ends when the client goes away, or when the writer stops because
    // the session was dropped (shutdown drain, stalled queue).
    let writer_done = loop {
        let received = tokio::select! {
            received = tokio::time::timeout(state.config.idle_timeout, conn.recv()) => received,
            _ = &mut writer => {
                tracing::debug!(%conn_id, "writer finished, closing connection");
                break true;
            }
        };

        let text = match received {
            Ok(Ok(Some(text))) => text,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break false;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break false;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, dropping");
                break false;
            }
        };

        let envelope: Envelope = match state.codec.decode_text(&text) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                send(
                    &state,
                    conn_id,
                    HubEvent::error(error_code::BAD_REQUEST, "malformed message"),
                );
                continue;
            }
        };

        match envelope.payload {
            Payload::Request(request) => {
                handle_request(&state, conn_id, request).await;
            }
            Payload::Event(_) => {
                tracing::debug!(%conn_id, "ignoring event sent by client");
            }
        }
    };

    // Session removed, rooms notified. Removing the session ends the
    // writer once it has flushed what is queued.
    drop(guard);
    if !writer_done
        && tokio::time::timeout(state.config.idle_timeout, writer)
            .await
            .is_err()
    {
        tracing::debug!(%conn_id, "writer did not flush in time");
    }
    Ok(())
}

/// Receives the Handshake, checks the version and authenticates.
///
/// Failures are reported to the client directly on the socket (no
/// session exists yet) and end the connection.
async fn perform_handshake<A, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
) -> Result<Option<pairhub_protocol::AccountRef>, PairhubError>
where
    A: Authenticator,
    C: Codec,
{
    let text = match tokio::time::timeout(
        state.config.handshake_timeout,
        conn.recv(),
    )
    .await
    {
        Ok(Ok(Some(text))) => text,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(PairhubError::Transport(e)),
        Err(_) => {
            return Err(
                ProtocolError::InvalidMessage("handshake timed out".into()).into()
            );
        }
    };

    let envelope: Envelope = state.codec.decode_text(&text)?;

    let (version, token) = match envelope.payload {
        Payload::Request(HubRequest::Handshake { version, token }) => {
            (version, token)
        }
        _ => {
            reject(conn, state, error_code::BAD_REQUEST, "expected Handshake").await?;
            return Err(ProtocolError::InvalidMessage(
                "first message must be Handshake".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        reject(
            conn,
            state,
            error_code::BAD_REQUEST,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::UnsupportedVersion {
            expected: PROTOCOL_VERSION,
            got: version,
        }
        .into());
    }

    match state.auth.authenticate(token.as_deref()).await {
        Ok(account) => Ok(account),
        Err(e) => {
            reject(conn, state, error_code::UNAUTHORIZED, "unauthorized").await?;
            Err(PairhubError::Session(e))
        }
    }
}

/// Routes one request and queues whatever events it produces.
async fn handle_request<A, C>(
    state: &ServerState<A, C>,
    conn_id: ConnectionId,
    request: HubRequest,
) where
    A: Authenticator,
    C: Codec,
{
    tracing::debug!(%conn_id, method = request.method(), "request");

    match request {
        HubRequest::Handshake { .. } => {
            send(
                state,
                conn_id,
                HubEvent::error(error_code::BAD_REQUEST, "already handshaken"),
            );
        }

        HubRequest::Heartbeat { client_time } => {
            send(state, conn_id, HubEvent::HeartbeatAck {
                client_time,
                server_time: state.now_ms(),
            });
        }

        HubRequest::CreateRoom {
            game_type,
            room_code,
        } => {
            let created = state.rooms.create_room(&game_type, &room_code).await;
            send(state, conn_id, HubEvent::RoomCreated {
                room_key: pairhub_protocol::RoomKey::new(game_type, &room_code),
                created,
            });
        }

        HubRequest::RoomExists {
            game_type,
            room_code,
        } => {
            let exists = state.rooms.room_exists(&game_type, &room_code);
            send(state, conn_id, HubEvent::RoomExistence {
                room_key: pairhub_protocol::RoomKey::new(game_type, &room_code),
                exists,
            });
        }

        HubRequest::JoinRoom {
            game_type,
            room_code,
            player_id,
        } => {
            let account = state.sessions.account(conn_id);
            match state
                .rooms
                .join(&game_type, &room_code, player_id, conn_id, account)
                .await
            {
                Ok(outcome) => {
                    send(state, conn_id, HubEvent::JoinedRoom {
                        room_key: outcome.room_key.clone(),
                        role: outcome.role,
                        color: outcome.color,
                    });
                    if outcome.started_now {
                        state.sessions.fan_out(&outcome.members, &HubEvent::StartGame {
                            room_key: outcome.room_key,
                        });
                    }
                }
                Err(e) => send_room_error(state, conn_id, &e),
            }
        }

        HubRequest::ReconnectToRoom {
            game_type,
            room_code,
            player_id,
        } => {
            match state
                .rooms
                .reconnect(&game_type, &room_code, player_id, conn_id)
                .await
            {
                Ok(outcome) => send(state, conn_id, HubEvent::Reconnected {
                    room_key: outcome.room_key,
                    role: outcome.role,
                    color: outcome.color,
                    game: outcome.game,
                }),
                Err(RoomError::UnauthorizedReconnect { room_key, player_id }) => {
                    tracing::info!(%conn_id, %room_key, %player_id, "unauthorized reconnect");
                    send(state, conn_id, HubEvent::UnauthorizedReconnect { room_key });
                }
                Err(e) => send_room_error(state, conn_id, &e),
            }
        }

        HubRequest::HandleCommand {
            game_type,
            room_code,
            player_id,
            command,
        } => {
            match state
                .rooms
                .handle_command(&game_type, &room_code, &player_id, conn_id, &command)
                .await
            {
                Ok(Dispatch::Broadcast { event, targets }) => {
                    state.sessions.fan_out(&targets, &HubEvent::from(event));
                }
                Ok(Dispatch::Caller(event)) => {
                    send(state, conn_id, HubEvent::from(event));
                }
                Ok(Dispatch::Ignored) => {}
                Err(e) => send_room_error(state, conn_id, &e),
            }
        }
    }
}

/// Drains a session's outbound queue onto the socket, then closes it.
async fn write_loop<A, C>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<A, C>>,
    mut outbound: mpsc::Receiver<HubEvent>,
) where
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    let mut seq: u64 = 1;

    while let Some(event) = outbound.recv().await {
        let envelope = Envelope::event(next_seq(&mut seq), state.now_ms(), event);
        let text = match state.codec.encode_text(&envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send_text(&text).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }

    let _ = conn.close().await;
}

/// Queues an event for one connection. A closed connection is not an
/// error here; its guard is already cleaning up.
fn send<A: Authenticator, C: Codec>(
    state: &ServerState<A, C>,
    conn_id: ConnectionId,
    event: HubEvent,
) {
    if let Err(e) = state.sessions.send_to(conn_id, event) {
        tracing::debug!(%conn_id, error = %e, "dropping event");
    }
}

fn send_room_error<A: Authenticator, C: Codec>(
    state: &ServerState<A, C>,
    conn_id: ConnectionId,
    err: &RoomError,
) {
    let code = match err {
        RoomError::UnknownGameType(_) => error_code::BAD_REQUEST,
        RoomError::UnauthorizedReconnect { .. } => error_code::UNAUTHORIZED,
        RoomError::NotFound(_) => error_code::NOT_FOUND,
        RoomError::RoomFull(_) => error_code::CONFLICT,
    };
    send(state, conn_id, HubEvent::error(code, err.to_string()));
}

/// Sends an Error straight to the socket, for failures before the
/// session exists.
async fn reject<A: Authenticator, C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<A, C>,
    code: u16,
    message: &str,
) -> Result<(), PairhubError> {
    let envelope = Envelope::event(1, state.now_ms(), HubEvent::error(code, message));
    let text = state.codec.encode_text(&envelope)?;
    conn.send_text(&text).await?;
    Ok(())
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
