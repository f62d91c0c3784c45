//! Error types for the Postal client.

use crate::envelope::null_as_default;
use serde::Deserialize;
use std::fmt;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Building, sending, or reading an HTTP request failed (including timeouts).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The request body could not be encoded as JSON.
    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Postal reported a failure in its response envelope.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A non-2xx response whose body was not a Postal envelope.
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The envelope or its `data` payload did not have the expected shape.
    #[error("failed to parse response: {0}")]
    ResponseParse(#[source] serde_json::Error),

    /// The client was configured with invalid parameters.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if Postal itself rejected the request.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Error::Api(_))
    }

    /// The structured Postal error, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the request hit the configured deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Request(err) if err.is_timeout())
    }
}

/// Error envelope returned by the Postal API.
///
/// Postal answers failures with the same `{status, time, flags, data}` shape as
/// successes. The error code and human readable message sit either at the top
/// level or inside `data`, depending on the endpoint; [`ApiError::code`] and
/// [`ApiError::message`] look in both places.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    /// HTTP status code of the response.
    #[serde(skip)]
    pub http_status: u16,
    /// Envelope status, e.g. `"error"` or `"parameter-error"`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    /// Server-side processing time in seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: f64,
    #[serde(default)]
    pub flags: serde_json::Value,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    /// Machine readable error code, e.g. `"ValidationError"`.
    pub fn code(&self) -> Option<&str> {
        self.error_code
            .as_deref()
            .or_else(|| self.data.get("code").and_then(|v| v.as_str()))
    }

    /// Human readable error message.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or_else(|| self.data.get("message").and_then(|v| v.as_str()))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postal API error: {} - {}",
            self.status,
            self.message().unwrap_or_default()
        )
    }
}

impl std::error::Error for ApiError {}
