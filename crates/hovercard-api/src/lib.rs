//! HTTP client for the forum's user-info endpoint.

mod error;
pub mod payload;

use std::time::Duration;

use tracing::debug;

pub use error::ApiError;
pub use payload::{RawLevel, UserInfoResponse, UserPayload};

/// Query parameter carrying the username.
const USERNAME_PARAM: &str = "username";

/// Client for `GET {base_url}{user_info_path}?username=<name>`.
#[derive(Debug, Clone)]
pub struct HttpProfileApi {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpProfileApi {
    /// Build a client for the given base URL and endpoint path.
    ///
    /// # Errors
    /// Returns [`ApiError::Client`] when the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, user_info_path: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            endpoint: endpoint_url(base_url, user_info_path),
        })
    }

    /// Fully resolved endpoint URL (without query string).
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the user object for `username`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] when the request fails, the status is not 2xx,
    /// the body cannot be decoded, the API reports `success: false`, or the
    /// user object is missing.
    pub async fn user_info(&self, username: &str) -> Result<UserPayload, ApiError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[(USERNAME_PARAM, username)])
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: UserInfoResponse = response.json().await.map_err(ApiError::Decode)?;
        debug!(%username, success = envelope.success, "Decoded user info");
        into_user(envelope)
    }
}

fn into_user(envelope: UserInfoResponse) -> Result<UserPayload, ApiError> {
    if !envelope.success {
        return Err(ApiError::Rejected(
            envelope.message.unwrap_or_else(|| "success=false".to_owned()),
        ));
    }
    envelope.user.ok_or(ApiError::MissingUser)
}

fn endpoint_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        return base.to_owned();
    }
    format!("{base}/{}", path.trim_start_matches('/'))
}
