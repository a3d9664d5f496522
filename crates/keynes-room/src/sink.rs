//! The outbound port rooms publish snapshots through.

use keynes_protocol::{GameState, RoomId};

/// Receives every snapshot a room broadcasts.
///
/// Called from inside the room actor, so implementations must not block:
/// queue the snapshot and return. Delivery is best effort.
pub trait BroadcastSink: Send + Sync + 'static {
    fn publish(&self, room_id: &RoomId, state: &GameState);
}

impl<F> BroadcastSink for F
where
    F: Fn(&RoomId, &GameState) + Send + Sync + 'static,
{
    fn publish(&self, room_id: &RoomId, state: &GameState) {
        self(room_id, state);
    }
}
