//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes are malformed or don't match the expected frame shape.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// A structurally valid frame that violates the protocol.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
