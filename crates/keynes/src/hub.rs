//! Connection hub: fans room snapshots out to live connections.
//!
//! Every connection handler registers an outbound channel here under its
//! [`PlayerId`]. Rooms publish through the hub as their
//! [`BroadcastSink`]; the hub looks up each member of the room and queues
//! a [`ServerMessage::GameStateUpdate`] on its channel. The handler task
//! owns the socket and drains the channel.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use keynes_protocol::{GameState, PlayerId, RoomId, ServerMessage};
use keynes_room::BroadcastSink;
use tokio::sync::mpsc;

/// Registry of outbound channels, one per live connection.
///
/// Publishing is synchronous and never blocks: channels are unbounded,
/// and members with no live connection (e.g. restored from a snapshot)
/// are skipped.
#[derive(Default)]
pub struct ConnectionHub {
    outbound: RwLock<HashMap<PlayerId, mpsc::UnboundedSender<ServerMessage>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the receiving end of its
    /// outbound channel. Registering an id again replaces the old channel.
    pub fn register(&self, player_id: PlayerId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.write().insert(player_id, tx);
        rx
    }

    pub fn unregister(&self, player_id: PlayerId) {
        self.write().remove(&player_id);
    }

    // Every write is a single insert or remove, so poisoning is ignored.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PlayerId, mpsc::UnboundedSender<ServerMessage>>> {
        self.outbound.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PlayerId, mpsc::UnboundedSender<ServerMessage>>> {
        self.outbound.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BroadcastSink for ConnectionHub {
    fn publish(&self, room_id: &RoomId, state: &GameState) {
        let outbound = self.read();
        let mut delivered = 0usize;
        for id in state.member_ids() {
            if let Some(tx) = outbound.get(&id) {
                let msg = ServerMessage::GameStateUpdate { state: state.clone() };
                if tx.send(msg).is_ok() {
                    delivered += 1;
                }
            }
        }
        tracing::trace!(%room_id, phase = %state.phase, delivered, "state published");
    }
}
