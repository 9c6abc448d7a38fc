//! Identity newtypes.
//!
//! Rooms and players are identified by strings on the wire: room ids are
//! short numeric strings the host can share out-of-band, and players are
//! identified by the username they join with (there is no account system).
//! Wrapping both in newtypes keeps them from being mixed up with ordinary
//! strings or with each other.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unique identifier for a room (one race session).
///
/// Serialized as a plain string (`#[serde(transparent)]`), e.g. `"48213"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Returns the id as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The name a player joined with. Unique among the *active* connections of
/// a room; a departed player's name may be reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    /// Returns the username as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomId::from("48213")).unwrap();
        assert_eq!(json, "\"48213\"");
    }

    #[test]
    fn test_username_round_trip() {
        let name: Username = serde_json::from_str("\"azaky\"").unwrap();
        assert_eq!(name, Username::from("azaky"));
        assert_eq!(name.to_string(), "azaky");
    }
}
