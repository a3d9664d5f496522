//! Room registry: creates, tracks, and routes players to rooms.

use std::collections::HashMap;
use std::sync::Arc;

use keynes_protocol::{GamePhase, GameState, PlayerId, RoomId, RoomListEntry, ROOM_ID_ALPHABET, ROOM_ID_LEN};
use rand::Rng;
use tokio::sync::Mutex;

use crate::room::spawn_room;
use crate::{Admission, BroadcastSink, Game, RoomConfig, RoomError, RoomHandle};

/// Host name shown in the directory when a room has none.
const UNKNOWN_HOST: &str = "Unknown";

/// Manages all live rooms and tracks which connection is in which room.
///
/// This is the only entry point the server uses. All methods take
/// `&self`; the maps are locked only long enough to read or update them,
/// never across a round-trip to a room actor.
pub struct RoomRegistry {
    config: RoomConfig,
    sink: Arc<dyn BroadcastSink>,

    /// Live rooms, keyed by room ID.
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,

    /// Maps each connection to the room it is in.
    /// A connection is in at most ONE room at a time.
    members: Mutex<HashMap<PlayerId, RoomId>>,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms publish through `sink`.
    pub fn new(config: RoomConfig, sink: Arc<dyn BroadcastSink>) -> Self {
        Self {
            config: config.validated(),
            sink,
            rooms: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a new room with `host` seated as its host and returns the
    /// room's ID together with its first snapshot.
    ///
    /// The room does not broadcast this first snapshot; the caller
    /// delivers it, so it can announce the room ID first.
    pub async fn create_room(
        &self,
        host: PlayerId,
        host_name: impl Into<String>,
    ) -> Result<(RoomId, GameState), RoomError> {
        self.ensure_free(host, None).await?;

        let mut rooms = self.rooms.lock().await;
        let room_id = unique_room_id(&rooms);

        let mut game = Game::new(room_id.clone(), self.config.clone());
        game.add_player(host, host_name);
        let state = game.state().clone();

        let handle = spawn_room(game, Arc::clone(&self.sink));
        rooms.insert(room_id.clone(), handle);
        drop(rooms);

        self.members.lock().await.insert(host, room_id.clone());
        tracing::info!(%room_id, %host, "room created");
        Ok((room_id, state))
    }

    /// Adds a connection to a room, as a player or a spectator.
    ///
    /// Joining the room one is already in is harmless and reports
    /// [`Admission::AlreadyPresent`].
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        player_id: PlayerId,
        name: impl Into<String>,
    ) -> Result<Admission, RoomError> {
        self.ensure_free(player_id, Some(room_id)).await?;

        let handle = self.handle(room_id).await?;
        let admission = self.checked(&handle, handle.join(player_id, name).await).await?;

        self.members.lock().await.insert(player_id, room_id.clone());
        tracing::debug!(%room_id, %player_id, ?admission, "joined room");
        Ok(admission)
    }

    /// Forwards a start request to a room.
    pub async fn start_game(&self, room_id: &RoomId, caller: PlayerId) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        self.checked(&handle, handle.start_game(caller).await).await
    }

    /// Forwards a choice to a room.
    pub async fn submit_choice(&self, room_id: &RoomId, caller: PlayerId, choice: u8) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        self.checked(&handle, handle.submit_choice(caller, choice).await).await
    }

    /// Forwards a restart request to a room.
    pub async fn restart_game(&self, room_id: &RoomId, caller: PlayerId) -> Result<(), RoomError> {
        let handle = self.handle(room_id).await?;
        self.checked(&handle, handle.restart(caller).await).await
    }

    /// Removes a departed connection from its room. A room left with no
    /// players and no spectators is destroyed.
    ///
    /// Returns the room the connection was in, if any.
    pub async fn drop_connection(&self, player_id: PlayerId) -> Option<RoomId> {
        let room_id = self.members.lock().await.remove(&player_id)?;
        let handle = self.rooms.lock().await.get(&room_id).cloned()?;

        match handle.leave(player_id).await {
            Ok(0) | Err(_) => {
                self.forget(&handle).await;
                tracing::info!(%room_id, "room destroyed");
            }
            Ok(remaining) => {
                tracing::debug!(%room_id, %player_id, remaining, "left room");
            }
        }
        Some(room_id)
    }

    /// Directory of lobbies that can be joined, sorted by room ID.
    ///
    /// Rooms that fail to answer (e.g. shutting down) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomListEntry> {
        let mut entries = Vec::new();
        for handle in self.handles().await {
            let Ok(info) = handle.get_info().await else {
                continue;
            };
            if info.phase == GamePhase::Lobby && info.player_count > 0 {
                entries.push(RoomListEntry {
                    room_id: info.room_id,
                    player_count: info.player_count,
                    max_players: info.max_players,
                    host_name: info.host_name.unwrap_or_else(|| UNKNOWN_HOST.to_string()),
                });
            }
        }
        entries.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        entries
    }

    /// Current state of every room worth saving.
    ///
    /// A restored lobby nobody has joined since is left out, so it
    /// survives one restart and no more.
    pub async fn snapshots(&self) -> Vec<GameState> {
        let mut states = Vec::new();
        for handle in self.handles().await {
            match handle.get_info().await {
                Ok(info) if info.has_live_members => {}
                _ => continue,
            }
            if let Ok(state) = handle.snapshot().await {
                states.push(state);
            }
        }
        states.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        states
    }

    /// Current state of one room.
    pub async fn room_state(&self, room_id: &RoomId) -> Result<GameState, RoomError> {
        let handle = self.handle(room_id).await?;
        self.checked(&handle, handle.snapshot().await).await
    }

    /// Re-opens saved lobbies. States that are not a lobby with at least
    /// one player, or whose ID is already live, are skipped.
    ///
    /// Restored members are not tracked as connections: their original
    /// connections are gone. They keep their seats until the first live
    /// player joins, then leave the room to the newcomers.
    ///
    /// Returns how many rooms were restored.
    pub async fn restore(&self, states: Vec<GameState>) -> usize {
        let mut rooms = self.rooms.lock().await;
        let mut restored = 0;

        for state in states {
            let room_id = state.room_id.clone();
            if state.phase != GamePhase::Lobby || state.players.is_empty() {
                tracing::debug!(%room_id, phase = %state.phase, "skipping saved room");
                continue;
            }
            if rooms.contains_key(&room_id) {
                tracing::warn!(%room_id, "saved room already live, skipping");
                continue;
            }

            let players = state.players.len();
            let handle = spawn_room(Game::restored(state, self.config.clone()), Arc::clone(&self.sink));
            rooms.insert(room_id.clone(), handle);
            restored += 1;
            tracing::info!(%room_id, players, "room restored");
        }

        restored
    }

    /// The room a connection is in, if any.
    pub async fn room_of(&self, player_id: PlayerId) -> Option<RoomId> {
        self.members.lock().await.get(&player_id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Stops every room and forgets all memberships.
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = self.rooms.lock().await.drain().map(|(_, h)| h).collect();
        self.members.lock().await.clear();

        for handle in &handles {
            let _ = handle.shutdown().await;
        }
        tracing::info!(rooms = handles.len(), "registry shut down");
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    async fn handle(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    async fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.lock().await.values().cloned().collect()
    }

    /// Fails with [`RoomError::AlreadyInRoom`] if `player_id` is in a
    /// room other than `target`.
    async fn ensure_free(&self, player_id: PlayerId, target: Option<&RoomId>) -> Result<(), RoomError> {
        match self.members.lock().await.get(&player_id) {
            Some(current) if Some(current) != target => {
                Err(RoomError::AlreadyInRoom(player_id, current.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Passes `result` through, dropping the room from the registry if
    /// its actor turned out to be gone.
    async fn checked<T>(&self, handle: &RoomHandle, result: Result<T, RoomError>) -> Result<T, RoomError> {
        if let Err(RoomError::Unavailable(room_id)) = &result {
            tracing::warn!(%room_id, "room actor gone, dropping room");
            self.forget(handle).await;
        }
        result
    }

    /// Removes `handle`'s room from both maps, unless the ID has since
    /// been reused by another room.
    async fn forget(&self, handle: &RoomHandle) {
        let room_id = handle.room_id();
        let removed = {
            let mut rooms = self.rooms.lock().await;
            let live = rooms.get(room_id).is_some_and(|live| live.same_room(handle));
            if live {
                rooms.remove(room_id);
            }
            live
        };
        if removed {
            self.members.lock().await.retain(|_, rid| rid != room_id);
        }
    }
}

/// Draws room codes until one is not in use.
fn unique_room_id(rooms: &HashMap<RoomId, RoomHandle>) -> RoomId {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..ROOM_ID_LEN)
            .map(|_| char::from(ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())]))
            .collect();
        if let Ok(room_id) = RoomId::parse(&code) {
            if !rooms.contains_key(&room_id) {
                return room_id;
            }
        }
    }
}
