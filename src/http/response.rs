//! Response body parsing and error normalization.
//!
//! Error message precedence for a non-2xx body:
//! `error` field, then `message` field, then `HTTP <status> <statusText>`.
//! A 403 without a body message becomes "Permission denied". A 400 carrying
//! `validation_errors` or `errors` embeds the serialized payload in the message.

use serde_json::Value;

use crate::error::ApiError;
use crate::http::transport::RawResponse;
use crate::resilience::retries::{classify_status, StatusClass};

/// Parse a 2xx body. An empty body is treated as JSON `null`.
pub fn parse_success(response: &RawResponse) -> Result<Value, ApiError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| ApiError::parse(e.to_string()))
}

fn string_field<'a>(body: Option<&'a Value>, field: &str) -> Option<&'a str> {
    body?.get(field)?.as_str().filter(|s| !s.is_empty())
}

fn validation_payload(body: Option<&Value>) -> Option<&Value> {
    let body = body?;
    ["validation_errors", "errors"]
        .iter()
        .filter_map(|field| body.get(*field))
        .find(|v| !v.is_null())
}

/// Build the normalized error for a non-2xx response.
pub fn normalize_error(response: &RawResponse) -> ApiError {
    let status = response.status;
    let body: Option<Value> = serde_json::from_slice(&response.body).ok();
    let body = body.as_ref();

    let body_message = string_field(body, "error").or_else(|| string_field(body, "message"));
    let fallback = format!("HTTP {} {}", status, response.status_text)
        .trim_end()
        .to_string();

    match classify_status(status) {
        StatusClass::Unauthorized => ApiError::Unauthenticated {
            message: body_message.map(str::to_string).unwrap_or(fallback),
        },
        StatusClass::Retryable => ApiError::Transient {
            status: Some(status),
            message: body_message.map(str::to_string).unwrap_or(fallback),
        },
        StatusClass::Success | StatusClass::Terminal => {
            let detail = if status == 400 {
                validation_payload(body).cloned()
            } else {
                None
            };

            let message = match (&detail, body_message) {
                (Some(detail), message) => {
                    format!("{}: {}", message.unwrap_or("Validation failed"), detail)
                }
                (None, Some(message)) => message.to_string(),
                (None, None) if status == 403 => "Permission denied".to_string(),
                (None, None) => fallback,
            };

            ApiError::Client {
                status,
                message,
                detail,
            }
        }
    }
}
