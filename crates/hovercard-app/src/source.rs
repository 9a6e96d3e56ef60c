//! Abstraction over the external profile API.

use std::future::Future;

use anyhow::Error;
use hovercard_api::{ApiError, HttpProfileApi, UserPayload};

/// Source of raw user profiles.
///
/// Implemented by [`HttpProfileApi`] for production use and by in-memory
/// fakes in tests.
pub trait ProfileSource: Send + Sync + 'static {
    /// Error type bubbled up from the backing source.
    type Error: Into<Error> + Send;

    /// Look up the user object for `username`.
    ///
    /// # Errors
    /// Returns a source-specific error when the lookup fails for any reason,
    /// including the API reporting `success: false`.
    fn user_info(&self, username: &str) -> impl Future<Output = Result<UserPayload, Self::Error>> + Send;
}

impl ProfileSource for HttpProfileApi {
    type Error = ApiError;

    fn user_info(&self, username: &str) -> impl Future<Output = Result<UserPayload, Self::Error>> + Send {
        Self::user_info(self, username)
    }
}
