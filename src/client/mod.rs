//! Resilient request client.
//!
//! # Data Flow
//! ```text
//! request(path, options, max_retries)
//!     → cache lookup (GET, not excluded) ── hit ──▶ return cached data
//!     → in-flight lookup (any method) ── hit ──▶ await shared result
//!     → spawn attempt loop (executor.rs)
//!         → attach bearer token, send, classify
//!         → 401: single-flight refresh, re-issue once
//!         → 429/5xx/network: back off, retry while budget remains
//!     → store successful GET with routed TTL
//!     → drop in-flight entry
//! ```
//!
//! # Design Decisions
//! - One `RequestClient` owns all mutable state; clones share it
//! - Every caller of a key sees the same outcome, errors included
//! - The cache administration surface is for diagnostics, not business logic

pub mod builder;
mod executor;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::auth::{AuthEvent, CredentialStore, RefreshCoordinator};
use crate::cache::{CacheStats, PendingRegistry, ResponseCache, TtlPolicy};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::request::{cache_key, RequestDescriptor, RequestOptions};
use crate::http::transport::Transport;
use crate::observability::metrics;
use crate::resilience::Backoff;

pub use builder::{BuildError, ClientBuilder};

pub(crate) struct ClientInner {
    pub(crate) base_url: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) refresher: RefreshCoordinator,
    pub(crate) cache: ResponseCache,
    pub(crate) pending: PendingRegistry,
    pub(crate) policy: TtlPolicy,
    pub(crate) backoff: Backoff,
    pub(crate) attempt_timeout: Duration,
    pub(crate) default_retries: u32,
    pub(crate) retry_on_network_error: bool,
}

/// Shared HTTP request layer.
///
/// Cheap to clone; clones share cache, in-flight registry and credentials.
#[derive(Clone)]
pub struct RequestClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl RequestClient {
    /// Build a client with the reqwest transport.
    pub fn new(config: ClientConfig) -> Result<Self, BuildError> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Issue a request and deserialize the JSON response into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
        max_retries: u32,
    ) -> ApiResult<T> {
        let value = self.request_value(path, options, max_retries).await?;
        serde_json::from_value(value).map_err(|e| ApiError::parse(e.to_string()))
    }

    /// Issue a request and return the raw JSON response.
    pub async fn request_value(
        &self,
        path: &str,
        options: RequestOptions,
        max_retries: u32,
    ) -> ApiResult<Value> {
        let descriptor = RequestDescriptor::new(path, options, max_retries);
        let key = descriptor.cache_key();
        let cacheable = self.inner.policy.is_cacheable(&descriptor.method, path);

        if cacheable {
            if let Some(data) = self.inner.cache.get(&key) {
                tracing::debug!(key = %key, "Cache hit");
                metrics::record_cache_hit();
                return Ok(data);
            }
        }

        let inner = self.inner.clone();
        let work_key = key.clone();
        let pending = self.inner.pending.join_or_start(&key, move || {
            // A request for this key may have settled between the first lookup and now.
            let cached = if cacheable { inner.cache.get(&work_key) } else { None };

            async move {
                if let Some(data) = cached {
                    return Ok(data);
                }

                let path = descriptor.path.clone();
                let result = inner.execute(descriptor).await;
                if let (Ok(data), true) = (&result, cacheable) {
                    let ttl = inner.policy.ttl_for(&path);
                    tracing::debug!(key = %work_key, ttl = ?ttl, "Caching response");
                    inner.cache.insert(work_key, data.clone(), ttl);
                }
                result
            }
        });

        if pending.is_joined() {
            tracing::debug!(key = %key, "Joined in-flight request");
            metrics::record_dedup_hit();
        }
        pending.into_future().await
    }

    /// GET with the configured retry budget.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(path, RequestOptions::get(), self.inner.default_retries)
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request(path, RequestOptions::delete(), self.inner.default_retries)
            .await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body =
            serde_json::to_value(body).map_err(|e| ApiError::invalid_request(e.to_string()))?;
        let options = RequestOptions::new(method).body(body);
        self.request(path, options, self.inner.default_retries).await
    }

    // --- Cache administration ---

    pub fn clear_all(&self) {
        self.inner.cache.clear_all();
        tracing::debug!("Response cache cleared");
    }

    /// Evict every cached entry whose key contains `pattern`.
    pub fn clear_pattern(&self, pattern: &str) -> usize {
        let removed = self.inner.cache.clear_pattern(pattern);
        tracing::debug!(pattern = %pattern, removed, "Cache entries evicted by pattern");
        removed
    }

    /// Evict the cached GET response for exactly `path`.
    pub fn invalidate(&self, path: &str) -> bool {
        self.inner.cache.remove(&cache_key(&Method::GET, path, None))
    }

    pub fn purge_expired(&self) -> usize {
        self.inner.cache.purge_expired()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.len()
    }

    /// Retry budget used by the convenience verbs.
    pub fn default_retries(&self) -> u32 {
        self.inner.default_retries
    }

    // --- Credentials ---

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    /// Subscribe to refresh/clear notifications, e.g. to redirect to login.
    pub fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.refresher.subscribe()
    }
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.inner.base_url)
            .field("cached", &self.inner.cache.len())
            .field("in_flight", &self.inner.pending.len())
            .finish()
    }
}
