//! Request gateway errors.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
///
/// `Transport` means no response was received; `Http` means the server
/// answered with a non-success status. The two are never conflated.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response reached the client (connection refused, reset, timeout).
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server responded with a non-success status.
    ///
    /// `payload` is the response body exactly as sent, parsed as JSON when
    /// possible and otherwise kept as a JSON string.
    #[error("HTTP {status}: {}", summarize_payload(.payload))]
    Http {
        /// Response status.
        status: StatusCode,
        /// Response body, untouched.
        payload: Value,
    },

    /// The request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A success response carried a body that is not JSON.
    #[error("HTTP {status} response is not valid JSON: {source}")]
    Decode {
        /// Response status.
        status: StatusCode,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The endpoint could not be resolved against the API root.
    #[error("Invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint {
        /// Endpoint as given by the caller.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The underlying HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Setup(#[source] reqwest::Error),
}

impl GatewayError {
    /// Status code of the response, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Error payload returned by the server, if any.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Http { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Whether the failure happened before any response was received.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Short human-readable form of an error payload for log lines and
/// `Display`. The payload itself is never altered.
fn summarize_payload(payload: &Value) -> String {
    const MAX_CHARS: usize = 200;

    let text = match payload {
        Value::Object(map) => map
            .get("error")
            .or_else(|| map.get("detail"))
            .and_then(Value::as_str)
            .map_or_else(|| payload.to_string(), str::to_owned),
        Value::String(s) => s.clone(),
        Value::Null => "(empty body)".to_string(),
        other => other.to_string(),
    };

    text.chars().take(MAX_CHARS).collect()
}
