//! # Keynes
//!
//! Server for a multiplayer elimination game: every round each player
//! picks a number from 0 to 100, and whoever lands closest to 0.8 times
//! the average keeps their points. Everyone else loses one. Reach -10
//! and you are out; the last player standing wins.
//!
//! Clients speak JSON envelopes over WebSocket (see
//! [`keynes_protocol`]). Each room runs as its own actor (see
//! [`keynes_room`]); this crate wires the transport to the rooms and
//! pushes every room snapshot to the room's members.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keynes::prelude::*;
//!
//! # async fn start() -> Result<(), KeynesError> {
//! let server = KeynesServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod hub;
mod server;
mod snapshot;

pub use config::{ConfigError, ServerConfig, SnapshotConfig, DEFAULT_BIND_ADDR, DEFAULT_SNAPSHOT_INTERVAL};
pub use error::KeynesError;
pub use hub::ConnectionHub;
pub use server::{KeynesServer, KeynesServerBuilder};
pub use snapshot::{SnapshotError, SnapshotStore};

pub use keynes_protocol as protocol;
pub use keynes_room as room;

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{KeynesError, KeynesServer, KeynesServerBuilder, ServerConfig, SnapshotConfig};
    pub use keynes_protocol::{ClientMessage, Envelope, GamePhase, GameState, PlayerId, RoomId, ServerMessage};
    pub use keynes_room::RoomConfig;
}
