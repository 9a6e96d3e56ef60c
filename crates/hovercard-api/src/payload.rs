//! Wire format of the `getUserInfo` endpoint.
//!
//! Every user field is kept as raw JSON so that a single malformed field never
//! fails the whole response; the accessors decode leniently.

use serde::Deserialize;
use serde_json::Value;

/// Envelope returned by the user-info endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfoResponse {
    /// Whether the lookup succeeded.
    #[serde(default)]
    pub success: bool,
    /// User object, present on success.
    #[serde(default)]
    pub user: Option<UserPayload>,
    /// Optional human-readable reason on failure.
    #[serde(default)]
    pub message: Option<String>,
}

/// Raw user object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    /// Numeric id (number or numeric string).
    #[serde(default)]
    pub id: Value,
    /// Avatar reference.
    #[serde(default)]
    pub avatar: Value,
    /// Legacy single role.
    #[serde(default)]
    pub role: Value,
    /// Role list.
    #[serde(default)]
    pub roles: Value,
    /// Level object `{name, color}` or bare name.
    #[serde(default)]
    pub level: Value,
    /// Point total.
    #[serde(default)]
    pub points: Value,
    /// Account creation timestamp.
    #[serde(default)]
    pub join_date: Value,
}

/// Decoded level badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLevel {
    /// Level name.
    pub name: String,
    /// Badge color.
    pub color: Option<String>,
}

impl UserPayload {
    /// Positive numeric id, if any.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        as_u64(&self.id).filter(|id| *id > 0)
    }

    /// Non-blank avatar reference.
    #[must_use]
    pub fn avatar(&self) -> Option<String> {
        non_blank(&self.avatar)
    }

    /// Role tags in server order: the `roles` array when it has entries,
    /// otherwise the single `role` string.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        let listed: Vec<String> = self
            .roles
            .as_array()
            .map(|items| items.iter().filter_map(non_blank).collect())
            .unwrap_or_default();
        if !listed.is_empty() {
            return listed;
        }
        non_blank(&self.role).into_iter().collect()
    }

    /// Level badge, accepting either an object or a bare name.
    #[must_use]
    pub fn level(&self) -> Option<RawLevel> {
        match &self.level {
            Value::Object(map) => {
                let name = map.get("name").and_then(non_blank)?;
                let color = map.get("color").and_then(non_blank);
                Some(RawLevel { name, color })
            }
            other => non_blank(other).map(|name| RawLevel { name, color: None }),
        }
    }

    /// Point total; negatives and garbage read as zero.
    #[must_use]
    pub fn points(&self) -> u64 {
        as_u64(&self.points).unwrap_or(0)
    }

    /// Raw join date string.
    #[must_use]
    pub fn join_date(&self) -> Option<String> {
        non_blank(&self.join_date)
    }
}

fn non_blank(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // guarded by the range checks
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
            .or_else(|| n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(|v| v.max(0) as u64),
        _ => None,
    }
}
