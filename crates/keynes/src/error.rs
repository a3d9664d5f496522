//! Unified error type for the Keynes server.

use keynes_protocol::ProtocolError;
use keynes_room::RoomError;
use keynes_transport::TransportError;

use crate::config::ConfigError;
use crate::snapshot::SnapshotError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KeynesError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad room code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (unknown room, already in a room).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading or writing the snapshot file failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use keynes_protocol::RoomId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed("gone".into());
        let keynes_err: KeynesError = err.into();
        assert!(matches!(keynes_err, KeynesError::Transport(_)));
        assert!(keynes_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidRoomId("abc".into());
        let keynes_err: KeynesError = err.into();
        assert!(matches!(keynes_err, KeynesError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId::parse("ABC123").unwrap());
        let keynes_err: KeynesError = err.into();
        assert!(matches!(keynes_err, KeynesError::Room(_)));
        assert_eq!(keynes_err.to_string(), "Room ABC123 not found.");
    }

    #[test]
    fn test_from_config_error() {
        let err = ConfigError::Invalid {
            key: "PORT",
            value: "http".into(),
        };
        let keynes_err: KeynesError = err.into();
        assert!(matches!(keynes_err, KeynesError::Config(_)));
        assert!(keynes_err.to_string().contains("PORT"));
    }

    #[test]
    fn test_from_snapshot_error() {
        let err = SnapshotError::Io {
            path: "rooms.json".into(),
            source: std::io::Error::other("disk full"),
        };
        let keynes_err: KeynesError = err.into();
        assert!(matches!(keynes_err, KeynesError::Snapshot(_)));
    }
}
