//! Network transport.
//!
//! # Responsibilities
//! - Define the `Transport` seam the client issues attempts through
//! - Provide the reqwest-backed `HttpTransport`
//! - Map low-level failures into `TransportError`
//!
//! # Design Decisions
//! - One call to `send` is one network attempt; retries live above this layer
//! - Every request carries `Content-Type: application/json` and an `x-request-id`
//! - The cookie store is enabled so session cookies travel with every call

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::TimeoutConfig;

/// A fully resolved request ready to be sent.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Access token attached as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
    pub request_id: Uuid,
}

/// Status line and raw body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }
}

/// Failure before a response status was received.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the failure is a network condition (as opposed to a malformed request).
    pub fn is_network(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

impl TransportError {
    /// Map a reqwest failure.
    ///
    /// The reqwest client only carries the connect deadline; the per-attempt
    /// deadline is enforced by `with_timeout` and reported as `Timeout`.
    pub fn from_reqwest(e: reqwest::Error, connect_timeout: Duration) -> Self {
        if e.is_timeout() {
            TransportError::ConnectTimeout(connect_timeout)
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Issues a single network attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    connect_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport with connect timeout and cookie store enabled.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, TransportError> {
        let connect_timeout = Duration::from_secs(timeouts.connect_secs);
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            connect_timeout,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-request-id", request.request_id.to_string());

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header value: {}", e)))?;
            builder = builder.header(name, value);
        }

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| TransportError::InvalidRequest(format!("body: {}", e)))?;
            builder = builder.body(bytes);
        }

        let to_transport = |e| TransportError::from_reqwest(e, self.connect_timeout);
        let response = builder.send().await.map_err(to_transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(to_transport)?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body: body.to_vec(),
        })
    }
}
