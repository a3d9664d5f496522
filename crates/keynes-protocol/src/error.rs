//! Error types for the protocol layer.
//!
//! Each crate in Keynes defines its own error enum. When you see a
//! `ProtocolError`, the problem is in serialization or in the shape of
//! a value, not in networking or game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, an
    /// unknown message `type`, or a choice outside `0..=255`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code that is not 6 characters of `A-Z0-9`.
    #[error("invalid room id {0:?}")]
    InvalidRoomId(String),
}
