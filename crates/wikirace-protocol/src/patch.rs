//! Typed partial updates.
//!
//! Settings changes and state broadcasts never ship the whole room — only
//! the fields that changed. Instead of an untyped recursive merge, each
//! mutable section has an explicit patch struct: a field is applied exactly
//! when it is `Some`, so the set of mutable fields is machine-checkable.
//!
//! Two directions, two shapes:
//! - [`SettingsPatch`] is what the host *sends* (host transfer, round
//!   setup, rules);
//! - [`RoomDelta`] is what the server *broadcasts* (which additionally
//!   covers rosters, leaderboards, tickers, and round results).

use serde::{Deserialize, Serialize};

use crate::{LeaderboardEntry, Metric, RoundResultEntry, Rules, Username};

// ---------------------------------------------------------------------------
// Host → server
// ---------------------------------------------------------------------------

/// A host-issued settings mutation, valid only while the room is in the
/// lobby. Every field is optional; omitted fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    /// Transfer host to another connected player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<Username>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<RoundSetup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<RulesPatch>,
}

/// The host picking the next round's article pair. Raw titles as typed by
/// the host; the server canonicalizes them through the article resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundSetup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// A partial update to [`Rules`], one `Option` per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_ctrlf: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_disambiguation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_back: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_nav: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_category: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_articles: Option<Vec<String>>,
}

impl RulesPatch {
    /// Overwrites exactly the fields present in the patch.
    pub fn apply_to(&self, rules: &mut Rules) {
        if let Some(v) = self.time_limit {
            rules.time_limit = v;
        }
        if let Some(v) = self.metric {
            rules.metric = v;
        }
        if let Some(v) = self.allow_ctrlf {
            rules.allow_ctrlf = v;
        }
        if let Some(v) = self.allow_disambiguation {
            rules.allow_disambiguation = v;
        }
        if let Some(v) = self.allow_back {
            rules.allow_back = v;
        }
        if let Some(v) = self.allow_nav {
            rules.allow_nav = v;
        }
        if let Some(v) = self.allow_category {
            rules.allow_category = v;
        }
        if let Some(v) = &self.banned_articles {
            rules.banned_articles = v.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Server → clients
// ---------------------------------------------------------------------------

/// A broadcast delta: the validated change, not the whole room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<Username>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Username>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_round: Option<RoundDelta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<RulesPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
}

impl RoomDelta {
    /// A delta carrying only the live countdown.
    pub fn time_left(secs: i64) -> Self {
        Self {
            current_round: Some(RoundDelta {
                time_left: Some(secs),
                ..RoundDelta::default()
            }),
            ..Self::default()
        }
    }

    /// A delta carrying only an updated round result projection.
    pub fn round_result(result: Vec<RoundResultEntry>) -> Self {
        Self {
            current_round: Some(RoundDelta {
                result: Some(result),
                ..RoundDelta::default()
            }),
            ..Self::default()
        }
    }
}

/// The round portion of a [`RoomDelta`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<RoundResultEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_patch_omitted_fields_stay_none() {
        // Only `currentRound.start` transmitted: everything else is None.
        let json = r#"{"currentRound": {"start": "Dog"}}"#;
        let patch: SettingsPatch = serde_json::from_str(json).unwrap();
        assert!(patch.host.is_none());
        assert!(patch.rules.is_none());
        let round = patch.current_round.unwrap();
        assert_eq!(round.start.as_deref(), Some("Dog"));
        assert!(round.target.is_none());
    }

    #[test]
    fn test_rules_patch_applies_only_present_fields() {
        let mut rules = Rules::default();
        let patch = RulesPatch {
            time_limit: Some(300),
            allow_back: Some(false),
            ..RulesPatch::default()
        };
        patch.apply_to(&mut rules);
        assert_eq!(rules.time_limit, 300);
        assert!(!rules.allow_back);
        // Untouched fields keep their values.
        assert_eq!(rules.metric, Metric::Clicks);
        assert!(rules.allow_disambiguation);
    }

    #[test]
    fn test_room_delta_skips_absent_fields_on_the_wire() {
        let delta = RoomDelta::time_left(42);
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, r#"{"currentRound":{"timeLeft":42}}"#);
    }

    #[test]
    fn test_round_delta_round_trip() {
        let delta = RoundDelta {
            start: Some("Dog".into()),
            start_thumbnail: Some("https://thumb".into()),
            ..RoundDelta::default()
        };
        let bytes = serde_json::to_vec(&delta).unwrap();
        let decoded: RoundDelta = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(delta, decoded);
    }
}
