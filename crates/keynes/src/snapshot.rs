//! Saving and restoring room state across restarts.
//!
//! The file is a JSON object keyed by room code:
//!
//! ```text
//! { "K7Q2ZA": { "room_id": "K7Q2ZA", "players": [...], ... }, ... }
//! ```
//!
//! Only lobbies are brought back. A game in progress cannot continue
//! without its players' connections, so it is dropped on load.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use keynes_protocol::{GamePhase, GameState, RoomId};

/// Errors from reading or writing the snapshot file.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed snapshot {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON file holding the last saved state of every room.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file with `states`.
    ///
    /// The data is written to a sibling temp file first and renamed over
    /// the old one, so a crash mid-write leaves the previous snapshot.
    pub async fn save(&self, states: &[GameState]) -> Result<(), SnapshotError> {
        let rooms: BTreeMap<&str, &GameState> = states.iter().map(|s| (s.room_id.as_str(), s)).collect();
        let json = serde_json::to_vec_pretty(&rooms).map_err(|source| SnapshotError::Format {
            path: self.path.clone(),
            source,
        })?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| self.io(e))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json).await.map_err(|e| self.io(e))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.io(e))?;

        tracing::debug!(path = %self.path.display(), rooms = rooms.len(), "snapshot saved");
        Ok(())
    }

    /// Reads back the lobbies worth restoring, sorted by room code.
    ///
    /// A missing file is an empty snapshot. Entries that are not a lobby
    /// with at least one player, or whose code is malformed, are skipped.
    pub async fn load(&self) -> Result<Vec<GameState>, SnapshotError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io(e)),
        };

        let rooms: BTreeMap<String, GameState> =
            serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Format {
                path: self.path.clone(),
                source,
            })?;

        let total = rooms.len();
        let states: Vec<GameState> = rooms
            .into_values()
            .filter(|state| {
                RoomId::is_valid(state.room_id.as_str())
                    && state.phase == GamePhase::Lobby
                    && !state.players.is_empty()
            })
            .collect();

        tracing::debug!(path = %self.path.display(), total, kept = states.len(), "snapshot loaded");
        Ok(states)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io(&self, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keynes_protocol::{Player, PlayerId};
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT: AtomicU32 = AtomicU32::new(0);

    fn scratch_path() -> PathBuf {
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir()
            .join(format!("keynes-snapshot-{}-{n}", std::process::id()))
            .join("rooms.json")
    }

    fn lobby(code: &str, players: u64) -> GameState {
        let mut state = GameState::new(RoomId::parse(code).unwrap(), 300);
        for i in 1..=players {
            state.players.push(Player::new(PlayerId(i), format!("p{i}"), 0, i == 1));
        }
        state
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let store = SnapshotStore::new(scratch_path());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_lobbies() {
        let store = SnapshotStore::new(scratch_path());
        let a = lobby("AAAAAA", 2);
        let b = lobby("BBBBBB", 1);
        store.save(&[b.clone(), a.clone()]).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, vec![a, b]);
        assert!(!store.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_load_skips_games_in_progress_and_empty_rooms() {
        let store = SnapshotStore::new(scratch_path());
        let mut playing = lobby("PLAY00", 2);
        playing.phase = GamePhase::Choosing;
        let mut over = lobby("OVER00", 2);
        over.phase = GamePhase::GameOver;
        let empty = lobby("EMPTY0", 0);
        let keep = lobby("KEEP00", 1);
        store.save(&[playing, over, empty, keep.clone()]).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec![keep]);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous() {
        let store = SnapshotStore::new(scratch_path());
        store.save(&[lobby("AAAAAA", 1)]).await.unwrap();
        store.save(&[lobby("BBBBBB", 1)]).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].room_id.as_str(), "BBBBBB");
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_format_error() {
        let path = scratch_path();
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = SnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SnapshotError::Format { .. }));
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        let store = SnapshotStore::new("/var/lib/keynes/rooms.json");
        assert_eq!(store.tmp_path(), PathBuf::from("/var/lib/keynes/rooms.json.tmp"));
    }
}
