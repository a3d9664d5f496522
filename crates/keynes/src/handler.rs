//! Per-connection handler: greeting, message routing, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound channel in the hub, send `Welcome`
//!   2. Loop: inbound frames are dispatched to the registry, outbound
//!      room snapshots are written to the socket
//!   3. On exit the guard unregisters and removes the player from its room

use std::sync::Arc;
use std::time::Instant;

use keynes_protocol::{ClientMessage, Codec, Envelope, PlayerId, RoomId, ServerMessage, PROTOCOL_VERSION};
use keynes_room::{Admission, RoomError};
use keynes_transport::{Connection, WebSocketConnection};

use crate::server::ServerState;
use crate::KeynesError;

/// Drop guard that takes a player out of the hub and its room when the
/// handler exits, however it exits.
///
/// `Drop` is synchronous, so the room cleanup runs as a spawned task.
struct ConnectionGuard {
    player_id: PlayerId,
    state: Arc<ServerState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.hub.unregister(self.player_id);

        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                if let Some(room_id) = state.registry.drop_connection(player_id).await {
                    tracing::debug!(%player_id, %room_id, "removed from room on disconnect");
                }
            });
        }
    }
}

/// Writes envelopes to one connection, numbering them.
struct Outbound<'a> {
    conn: &'a WebSocketConnection,
    state: &'a ServerState,
    seq: u64,
    start: Instant,
}

impl Outbound<'_> {
    async fn send(&mut self, payload: ServerMessage) -> Result<(), KeynesError> {
        let envelope = Envelope {
            seq: self.seq,
            timestamp: self.elapsed_ms(),
            payload,
        };
        self.seq += 1;
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn error(&mut self, message: impl Into<String>) -> Result<(), KeynesError> {
        self.send(ServerMessage::Error { message: message.into() }).await
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Whether the connection stays open after a message.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(conn: WebSocketConnection, state: Arc<ServerState>) -> Result<(), KeynesError> {
    let conn_id = conn.id();
    let player_id = state.player_id_for(conn_id);
    tracing::debug!(%conn_id, %player_id, "handling new connection");

    let mut events = state.hub.register(player_id);
    let _guard = ConnectionGuard {
        player_id,
        state: Arc::clone(&state),
    };

    let mut out = Outbound {
        conn: &conn,
        state: &state,
        seq: 0,
        start: Instant::now(),
    };
    out.send(ServerMessage::Welcome {
        player_id,
        protocol_version: PROTOCOL_VERSION,
    })
    .await?;

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(%player_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "recv error");
                        break;
                    }
                };

                let envelope: Envelope<ClientMessage> = match state.codec.decode(&data) {
                    Ok(env) => env,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                        continue;
                    }
                };

                if dispatch(&mut out, player_id, envelope.payload).await? == Flow::Close {
                    break;
                }
            }
            Some(event) = events.recv() => {
                out.send(event).await?;
            }
        }
    }

    let _ = conn.close().await;
    Ok(())
}

/// Routes one client action.
async fn dispatch(out: &mut Outbound<'_>, player_id: PlayerId, msg: ClientMessage) -> Result<Flow, KeynesError> {
    let state = out.state;
    let registry = &state.registry;

    match msg {
        ClientMessage::CreateRoom { name } => match registry.create_room(player_id, name).await {
            // The creator hears about the room before its first snapshot.
            Ok((room_id, snapshot)) => {
                out.send(ServerMessage::RoomCreated { room_id }).await?;
                out.send(ServerMessage::GameStateUpdate { state: snapshot }).await?;
            }
            Err(e) => out.error(client_message(&e)).await?,
        },

        ClientMessage::JoinRoom { room_id, name } => match registry.join_room(&room_id, player_id, name).await {
            // Nothing changed, so nothing was broadcast: resend the room.
            Ok(Admission::AlreadyPresent) => match registry.room_state(&room_id).await {
                Ok(snapshot) => out.send(ServerMessage::GameStateUpdate { state: snapshot }).await?,
                Err(e) => out.error(client_message(&e)).await?,
            },
            Ok(_) => {}
            Err(e) => out.error(client_message(&e)).await?,
        },

        ClientMessage::StartGame { room_id } => {
            if let Err(e) = registry.start_game(&room_id, player_id).await {
                out.error(client_message(&e)).await?;
            }
        }

        ClientMessage::PlayerChoice { room_id, choice } => {
            if let Err(e) = registry.submit_choice(&room_id, player_id, choice).await {
                out.error(client_message(&e)).await?;
            }
        }

        ClientMessage::RestartGame { room_id } => {
            if let Err(e) = registry.restart_game(&room_id, player_id).await {
                out.error(client_message(&e)).await?;
            }
        }

        ClientMessage::ListRooms => {
            let rooms = registry.list_rooms().await;
            out.send(ServerMessage::RoomList { rooms }).await?;
        }

        ClientMessage::Heartbeat { client_time } => {
            let server_time = out.elapsed_ms();
            out.send(ServerMessage::HeartbeatAck {
                client_time,
                server_time,
            })
            .await?;
        }

        ClientMessage::Disconnect { reason } => {
            tracing::info!(%player_id, %reason, "client disconnected");
            return Ok(Flow::Close);
        }
    }

    Ok(Flow::Continue)
}

/// The text a client sees for a failed action. A room whose actor is
/// gone reads the same as one that never existed.
fn client_message(err: &RoomError) -> String {
    match err {
        RoomError::Unavailable(room_id) => not_found(room_id),
        other => other.to_string(),
    }
}

fn not_found(room_id: &RoomId) -> String {
    RoomError::NotFound(room_id.clone()).to_string()
}
