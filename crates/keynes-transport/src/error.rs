/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listening socket failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer connected but the WebSocket upgrade failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

impl TransportError {
    /// `true` if the listener itself is still usable after this error,
    /// i.e. only one incoming connection was lost.
    pub fn is_per_connection(&self) -> bool {
        matches!(self, Self::HandshakeFailed(_) | Self::AcceptFailed(_))
    }
}
