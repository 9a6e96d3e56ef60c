use std::fmt;

/// Literal values that leak from loosely typed callers instead of a username.
const SENTINEL_KEYS: [&str; 2] = ["undefined", "null"];

/// Validated username used as cache and in-flight key.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SubjectKey(String);

impl SubjectKey {
    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key and return the owned string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of validating a raw subject key.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Subject {
    /// Usable key.
    Valid(SubjectKey),
    /// Empty or sentinel value; must not reach the cache or network.
    Invalid,
}

impl Subject {
    /// Validate a raw username.
    ///
    /// Keys are case-sensitive and kept verbatim; only blank strings and the
    /// `"undefined"` / `"null"` sentinels are rejected.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() || SENTINEL_KEYS.contains(&raw) {
            Self::Invalid
        } else {
            Self::Valid(SubjectKey(raw.to_owned()))
        }
    }

    /// Return the key when valid.
    #[must_use]
    pub fn key(self) -> Option<SubjectKey> {
        match self {
            Self::Valid(key) => Some(key),
            Self::Invalid => None,
        }
    }
}
