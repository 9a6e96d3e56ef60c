use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;

/// Username used for records produced from invalid subject keys.
pub const UNKNOWN_USERNAME: &str = "unknown";

/// Numeric identity of a user on the forum.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned when a textual user id cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid user id: {0:?}")]
pub struct ParseUserIdError(pub String);

impl FromStr for UserId {
    type Err = ParseUserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(Self(value)),
            _ => Err(ParseUserIdError(s.to_owned())),
        }
    }
}

/// Level badge shown next to a username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    /// Display name of the level.
    pub name: String,
    /// CSS-style color (usually `#rrggbb`).
    pub color: Option<String>,
}

/// Cached snapshot of a user's public profile.
///
/// A record without [`id`](Self::id) is a degraded placeholder and must never
/// be treated as authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Subject key; case-sensitive.
    pub username: String,
    /// Resolved identity, absent for placeholders.
    pub id: Option<UserId>,
    /// Avatar reference (URL or path).
    pub avatar: Option<String>,
    /// Role tags in display order.
    pub roles: Vec<String>,
    /// Level badge.
    pub level: Option<LevelDescriptor>,
    /// Point total.
    pub points: u64,
    /// Account creation time.
    #[serde(with = "time::serde::rfc3339::option")]
    pub joined_at: Option<OffsetDateTime>,
}

impl ProfileRecord {
    /// Placeholder for a subject whose profile could not be obtained.
    #[must_use]
    pub fn placeholder(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            id: None,
            avatar: None,
            roles: Vec::new(),
            level: None,
            points: 0,
            joined_at: None,
        }
    }

    /// Placeholder for an invalid subject key.
    #[must_use]
    pub fn unknown() -> Self {
        Self::placeholder(UNKNOWN_USERNAME)
    }

    /// Returns true when the record lacks an identity id.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }

    /// Returns true when the record belongs to `viewer`.
    #[must_use]
    pub fn is_viewer(&self, viewer: Option<UserId>) -> bool {
        matches!((self.id, viewer), (Some(id), Some(me)) if id == me)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn placeholder_has_no_identity() {
        let record = ProfileRecord::placeholder("alice");
        assert_eq!(record.username, "alice");
        assert!(record.is_placeholder());
        assert_eq!(record.points, 0);
        assert!(record.roles.is_empty());
    }

    #[test]
    fn unknown_uses_sentinel_username() {
        assert_eq!(ProfileRecord::unknown().username, UNKNOWN_USERNAME);
    }

    #[test]
    fn is_viewer_requires_both_ids() {
        let mut record = ProfileRecord::placeholder("bob");
        assert!(!record.is_viewer(Some(UserId(7))));
        record.id = Some(UserId(7));
        assert!(record.is_viewer(Some(UserId(7))));
        assert!(!record.is_viewer(Some(UserId(8))));
        assert!(!record.is_viewer(None));
    }

    #[test]
    fn user_id_rejects_zero_and_garbage() {
        assert_eq!("42".parse::<UserId>(), Ok(UserId(42)));
        assert!("0".parse::<UserId>().is_err());
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn record_serializes_join_date_as_rfc3339() {
        let record = ProfileRecord {
            id: Some(UserId(3)),
            joined_at: Some(datetime!(2024-03-01 12:00 UTC)),
            ..ProfileRecord::placeholder("carol")
        };
        let json = serde_json::to_value(&record).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(json["id"], 3);
        assert_eq!(json["joined_at"], "2024-03-01T12:00:00Z");
    }
}
