//! Error taxonomy surfaced to callers of the request client.

use serde_json::Value;
use thiserror::Error;

/// Result alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Terminal failure of a request.
///
/// The type is `Clone` because a single in-flight request can be shared by
/// several deduplicated callers, and each of them receives the same outcome.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// No usable credential, or the refresh exchange failed.
    #[error("{message}")]
    Unauthenticated { message: String },

    /// 429, 5xx, network failure or timeout after the retry budget ran out.
    #[error("{message}")]
    Transient { status: Option<u16>, message: String },

    /// 4xx other than 401. `detail` holds the validation payload if the body had one.
    #[error("{message}")]
    Client {
        status: u16,
        message: String,
        detail: Option<Value>,
    },

    /// Success response whose body was not valid JSON or had the wrong shape.
    #[error("Failed to parse response: {message}")]
    Parse { message: String },

    /// The request could not be built (bad URL, header, body).
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// HTTP status attached to the error, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated { .. } => Some(401),
            Self::Transient { status, .. } => *status,
            Self::Client { status, .. } => Some(*status),
            Self::Parse { .. } | Self::InvalidRequest { .. } => None,
        }
    }

    /// Human-readable message, identical to the `Display` output.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated { .. })
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "unauthenticated",
            Self::Transient { .. } => "transient",
            Self::Client { .. } => "client",
            Self::Parse { .. } => "parse",
            Self::InvalidRequest { .. } => "invalid_request",
        }
    }
}
