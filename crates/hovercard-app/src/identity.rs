//! Helper utilities for resolving the viewer's [`UserId`] from the environment
//! or the persisted session file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hovercard_core::UserId;
use serde::Deserialize;
use tracing::debug;

/// Environment variable checked first for the viewer id.
pub const ENV_VIEWER_ID: &str = "HOVERCARD_VIEWER_ID";

const SESSION_DIR: &str = "hovercard";
const SESSION_FILE: &str = "session.json";

/// Persisted login session written by the forum client.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SessionFile {
    /// Authenticated user id.
    pub id: UserId,
    /// Display name, when the client stored one.
    #[serde(default)]
    pub username: Option<String>,
}

/// Default location of the session file.
pub fn default_session_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SESSION_DIR).join(SESSION_FILE))
}

/// Resolve the viewer using the standard fallback order (env → session file → none).
pub fn viewer_id() -> Option<UserId> {
    let mut fetch = |key: &'static str| env::var(key).ok();
    viewer_id_with(&mut fetch, default_session_path().as_deref())
}

fn viewer_id_with(
    fetch: &mut impl FnMut(&'static str) -> Option<String>,
    session_path: Option<&Path>,
) -> Option<UserId> {
    if let Some(id) = viewer_id_from_env_with(fetch) {
        return Some(id);
    }
    let path = session_path?;
    match read_session(path) {
        Ok(session) => session.map(|session| session.id),
        Err(err) => {
            debug!(error = %format!("{err:#}"), "Ignoring unreadable session file");
            None
        }
    }
}

fn viewer_id_from_env_with(fetch: &mut impl FnMut(&'static str) -> Option<String>) -> Option<UserId> {
    let raw = fetch(ENV_VIEWER_ID)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse()
        .inspect_err(|err| debug!(%err, "Ignoring malformed {ENV_VIEWER_ID}"))
        .ok()
}

/// Read the session file at `path`; a missing file yields `None`.
///
/// # Errors
/// Returns an error when the file exists but cannot be read or parsed.
pub fn read_session(path: &Path) -> Result<Option<SessionFile>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let session = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(session))
}
