//! Error types for the GitHub Actions REST client.
//!
//! [`ApiError`] separates failures of the transport itself from responses the
//! platform did send but that we could not use.

use thiserror::Error;

/// Errors that can occur while talking to the GitHub REST API.
///
/// - [`Transport`](ApiError::Transport): the request never produced a response
/// - [`Protocol`](ApiError::Protocol): the platform answered with a non-2xx status
/// - [`Decode`](ApiError::Decode): a 2xx response whose body did not parse
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout and similar.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Unexpected HTTP status; `message` carries the response body.
    #[error("API error (status {status}): {message}")]
    Protocol { status: u16, message: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}
