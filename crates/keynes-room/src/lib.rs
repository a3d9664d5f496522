//! Game sessions and the room registry for Keynes.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns the
//! room's [`GameState`](keynes_protocol::GameState), its round countdown
//! and its pending phase alarm. Everything that can change a room is a
//! branch of that task's `select!` loop, so admissions, choices, timer
//! ticks and round resolution never interleave.
//!
//! # Key types
//!
//! - [`Game`] - the synchronous state machine; returns [`Effect`]s for
//!   the actor to carry out
//! - [`RoomRegistry`] - creates, looks up and destroys rooms
//! - [`RoomHandle`] - send commands to a running room actor
//! - [`BroadcastSink`] - where rooms publish their snapshots
//! - [`RoomConfig`] - seat limits, delays and round durations

mod config;
mod error;
mod logic;
mod manager;
mod room;
mod sink;

pub use config::RoomConfig;
pub use error::RoomError;
pub use logic::{Admission, Effect, Game, Step};
pub use manager::RoomRegistry;
pub use room::{RoomHandle, RoomInfo};
pub use sink::BroadcastSink;
