//! Error types for the Flipped API client.
//!
//! # Design
//! Three kinds of failure exist. `Validation` is produced locally before any
//! request leaves the process. `Transport` covers everything between the
//! socket and the status line: connection failures, timeouts and non-2xx
//! responses. `Decode` means the server answered 2xx but the body was not
//! the JSON we expected. None of them is fatal; each belongs to exactly one
//! call.

use serde::Deserialize;
use thiserror::Error;

/// Errors returned by `FlippedClient` and `ApiClient` operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// A required input was empty or malformed. No request was sent.
    #[error("invalid {field}")]
    Validation { field: String },

    /// The exchange failed or the server answered with a non-2xx status.
    /// `status` is `None` when no response was received at all.
    #[error("{}", transport_message(.status, .message))]
    Transport {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// The response body was not valid JSON or lacked expected keys.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Coarse category of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Decode,
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("HTTP {status}: {message}"),
        None => format!("transport failed: {message}"),
    }
}

/// JSON error body some server routes send alongside a non-2xx status.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<serde_json::Value>,
}

impl ApiError {
    pub fn validation(field: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
        }
    }

    /// Transport error for a failure that produced no HTTP response.
    pub fn connection(message: impl Into<String>) -> Self {
        ApiError::Transport {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Transport error for a non-2xx response.
    ///
    /// A JSON body with `message`/`code` keys supplies both; any other body
    /// is kept verbatim as the message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => (
                parsed.code.map(|c| match c {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                }),
                parsed.message.unwrap_or_else(|| body.to_string()),
            ),
            Err(_) => (None, body.to_string()),
        };
        ApiError::Transport {
            status: Some(status),
            code,
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Transport { .. } => ErrorKind::Transport,
            ApiError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// HTTP status carried by a transport error, if a response arrived.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Machine-readable code for callers that branch on failures.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Validation { .. } => Some("validation"),
            ApiError::Transport { code, .. } => code.as_deref(),
            ApiError::Decode(_) => Some("decode"),
        }
    }
}
