//! JSON encode/decode helpers.
//!
//! The wire format is JSON end to end — the client is a browser extension,
//! so a human-readable format is worth far more than compactness. These
//! helpers exist so transport code maps serde failures into
//! [`ProtocolError`] in one place instead of at every call site.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Serializes a frame to JSON bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(value).map_err(ProtocolError::Encode)
}

/// Deserializes a frame from JSON bytes.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(data).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientCommand, Request};

    #[test]
    fn test_encode_decode_round_trip() {
        let req = Request {
            seq: 1,
            command: ClientCommand::Start,
        };
        let bytes = encode(&req).unwrap();
        let decoded: Request = decode(&bytes).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let result: Result<Request, _> = decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
