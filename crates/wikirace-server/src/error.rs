//! Unified error type for the server binary.

use wikirace_protocol::ProtocolError;

/// Top-level server error. Gameplay errors never reach this type — they
/// travel back to clients as failed acks; this covers the infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Socket-level failure (bind, accept).
    #[error("transport failure: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or framing failure.
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Wire encode/decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
