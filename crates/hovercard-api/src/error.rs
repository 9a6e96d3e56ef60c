//! Error types for profile API calls.

use thiserror::Error;

/// Errors that can occur while calling the profile API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or the connection failed.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("Failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    /// The API reported `success: false`.
    #[error("Lookup rejected: {0}")]
    Rejected(String),

    /// The API reported success but did not include a user object.
    #[error("Response is missing the user object")]
    MissingUser,
}
