//! Request options, descriptors and cache key derivation.
//!
//! # Responsibilities
//! - Caller-facing `RequestOptions` (method, headers, JSON body)
//! - Per-attempt `RequestDescriptor` carrying the retry budget and request ID
//! - Cache/dedup key derivation from `(method, path, body)`
//! - Resolving a relative path against the base URL

use reqwest::Method;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::resilience::retries::RetryBudget;

/// Options supplied by the caller for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post(body: Value) -> Self {
        Self::new(Method::POST).body(body)
    }

    pub fn put(body: Value) -> Self {
        Self::new(Method::PUT).body(body)
    }

    pub fn patch(body: Value) -> Self {
        Self::new(Method::PATCH).body(body)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Key shared by the response cache and the in-flight registry.
///
/// Headers are not part of the key.
pub fn cache_key(method: &Method, path: &str, body: Option<&Value>) -> String {
    let body = body.map(Value::to_string).unwrap_or_default();
    format!("{}:{}:{}", method, path, body)
}

/// Join a base URL and a relative path by concatenation, keeping any path prefix on the base.
pub fn resolve_url(base_url: &str, path: &str) -> ApiResult<String> {
    let base = base_url.trim_end_matches('/');
    let joined = if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    };

    Url::parse(&joined)
        .map(|_| joined)
        .map_err(|e| ApiError::invalid_request(format!("invalid URL for path '{}': {}", path, e)))
}

/// One logical request as seen by the attempt loop.
///
/// A descriptor is never mutated; the next attempt is derived from it.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub request_id: Uuid,
    budget: RetryBudget,
}

impl RequestDescriptor {
    pub fn new(path: &str, options: RequestOptions, max_retries: u32) -> Self {
        Self {
            path: path.to_string(),
            method: options.method,
            headers: options.headers,
            body: options.body,
            request_id: Uuid::new_v4(),
            budget: RetryBudget::new(max_retries),
        }
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.method, &self.path, self.body.as_ref())
    }

    pub fn remaining_retries(&self) -> u32 {
        self.budget.remaining()
    }

    /// Derive the next attempt, spending one unit of the budget.
    ///
    /// Returns the 1-based retry number with the new descriptor, or `None` when
    /// the budget is exhausted.
    pub fn next_attempt(&self) -> Option<(u32, Self)> {
        let (attempt, budget) = self.budget.consume()?;
        Some((
            attempt,
            Self {
                budget,
                ..self.clone()
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_includes_method_path_body() {
        assert_eq!(cache_key(&Method::GET, "/api/posts", None), "GET:/api/posts:");
        assert_eq!(
            cache_key(&Method::POST, "/api/bids", Some(&json!({"amount": 5}))),
            r#"POST:/api/bids:{"amount":5}"#
        );
        assert_ne!(
            cache_key(&Method::GET, "/api/posts", None),
            cache_key(&Method::DELETE, "/api/posts", None)
        );
    }

    #[test]
    fn test_resolve_url_keeps_prefix() {
        assert_eq!(
            resolve_url("https://api.example.com/v1/", "/api/campaigns?limit=10").unwrap(),
            "https://api.example.com/v1/api/campaigns?limit=10"
        );
        assert_eq!(
            resolve_url("https://api.example.com", "api/posts").unwrap(),
            "https://api.example.com/api/posts"
        );
        assert!(resolve_url("not-a-base", "/x").is_err());
    }

    #[test]
    fn test_next_attempt_decrements_budget() {
        let descriptor = RequestDescriptor::new("/api/bids", RequestOptions::post(json!({})), 2);
        let (attempt, second) = descriptor.next_attempt().unwrap();
        assert_eq!(attempt, 1);
        assert_eq!(second.remaining_retries(), 1);
        assert_eq!(second.request_id, descriptor.request_id);
        assert_eq!(descriptor.remaining_retries(), 2);

        let (attempt, third) = second.next_attempt().unwrap();
        assert_eq!(attempt, 2);
        assert!(third.next_attempt().is_none());
    }
}
