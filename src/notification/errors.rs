//! Error types returned by Slack Web API clients.
//!
//! Every failure a [`MessagingClient`](crate::core::MessagingClient) can
//! report is one of these variants, so callers never have to inspect ad hoc
//! error shapes.

use std::fmt;
use thiserror::Error;

/// The code identifying which kind of failure a [`SlackApiError`] carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    PlatformError,
    RequestError,
    RateLimitedError,
    HttpError,
    /// A code the client reported but this crate does not know about.
    Other(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::PlatformError => f.write_str("slack_webapi_platform_error"),
            ErrorCode::RequestError => f.write_str("slack_webapi_request_error"),
            ErrorCode::RateLimitedError => f.write_str("slack_webapi_rate_limited_error"),
            ErrorCode::HttpError => f.write_str("slack_webapi_http_error"),
            ErrorCode::Other(code) => f.write_str(code),
        }
    }
}

/// A failure reported by the Slack Web API or the transport underneath it.
#[derive(Debug, Clone, Error)]
pub enum SlackApiError {
    /// Slack answered with `ok: false`.
    #[error("platform error: {error}")]
    Platform {
        /// The Slack error string, e.g. `channel_not_found`.
        error: String,
        /// The full response body.
        data: serde_json::Value,
    },

    /// The request never produced a response.
    #[error("request error: {original}")]
    Request { original: String },

    /// Slack asked the client to back off.
    #[error("rate limited: retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// Slack answered with a non-success HTTP status.
    #[error("HTTP error: status code {status_code}")]
    Http { status_code: u16, body: String },

    /// A coded failure with a code outside the known set.
    #[error("{code}: {message}")]
    Unknown { code: String, message: String },
}

impl SlackApiError {
    pub fn platform(error: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Platform {
            error: error.into(),
            data,
        }
    }

    pub fn request(original: impl fmt::Display) -> Self {
        Self::Request {
            original: original.to_string(),
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self::RateLimited { retry_after }
    }

    pub fn http(status_code: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status_code,
            body: body.into(),
        }
    }

    /// The failure code this error carries.
    pub fn code(&self) -> ErrorCode {
        match self {
            SlackApiError::Platform { .. } => ErrorCode::PlatformError,
            SlackApiError::Request { .. } => ErrorCode::RequestError,
            SlackApiError::RateLimited { .. } => ErrorCode::RateLimitedError,
            SlackApiError::Http { .. } => ErrorCode::HttpError,
            SlackApiError::Unknown { code, .. } => ErrorCode::Other(code.clone()),
        }
    }
}
