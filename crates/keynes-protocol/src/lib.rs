//! Wire protocol and snapshot model for Keynes.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **State** ([`GameState`], [`Player`], [`RoundResult`], ...) - the
//!   authoritative per-room snapshot that is broadcast on every mutation.
//! - **Types** ([`Envelope`], [`ClientMessage`], [`ServerMessage`]) -
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) - how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) - what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! layer (game sessions). It doesn't know about connections, timers or
//! rules - it only knows the shape of the data.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room (GameState)
//! ```

mod codec;
mod error;
mod state;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use state::{
    ChoiceRecord, GamePhase, GameState, Player, PointChange, RoundResult,
    Spectator,
};
pub use types::{
    ClientMessage, Envelope, PlayerId, RoomId, RoomListEntry, ServerMessage,
    ROOM_ID_ALPHABET, ROOM_ID_LEN,
};

/// The current protocol version, announced to every client in
/// [`ServerMessage::Welcome`].
pub const PROTOCOL_VERSION: u32 = 1;
