//! Error types for the room layer.

use keynes_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
///
/// Invalid game actions (a non-host starting the game, a choice outside
/// the choosing phase) are not errors: the room ignores them.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("Room {0} not found.")]
    NotFound(RoomId),

    /// The player is already seated or watching in another room.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The room's command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// `true` for errors a client should see as "no such room".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable(_))
    }
}
