//! Single-flight credential refresh.
//!
//! # Responsibilities
//! - Exchange the stored refresh token for a new credential pair
//! - Collapse concurrent refresh requests onto one exchange
//! - Persist the new pair and notify listeners
//!
//! # Design Decisions
//! - At most one exchange in flight per client; the slot is cleared when it
//!   settles, whatever the outcome
//! - The exchange runs on its own task so it always settles
//! - Every failure resolves to "no new token"; the caller decides what that means

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

use crate::auth::credentials::{CredentialPair, CredentialStore};
use crate::http::transport::{OutgoingRequest, Transport};
use crate::observability::metrics;
use crate::resilience::timeouts::with_timeout;

/// Credential lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A new credential pair was stored.
    Refreshed,
    /// Stored credentials were cleared; the user must sign in again.
    Cleared,
}

#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<CredentialPair>,
}

type SharedRefresh = Shared<BoxFuture<'static, Option<String>>>;

struct Slot {
    generation: u64,
    refresh: SharedRefresh,
}

struct RefreshInner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresh_url: String,
    attempt_timeout: Duration,
    slot: Mutex<Option<Slot>>,
    generation: AtomicU64,
    clear_lock: Mutex<()>,
    events: broadcast::Sender<AuthEvent>,
}

fn lock_slot(slot: &Mutex<Option<Slot>>) -> MutexGuard<'_, Option<Slot>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        refresh_url: String,
        attempt_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(RefreshInner {
                transport,
                store,
                refresh_url,
                attempt_timeout,
                slot: Mutex::new(None),
                generation: AtomicU64::new(0),
                clear_lock: Mutex::new(()),
                events,
            }),
        }
    }

    /// Subscribe to credential lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    /// Whether an exchange is currently in flight.
    pub fn in_progress(&self) -> bool {
        lock_slot(&self.inner.slot).is_some()
    }

    /// Join the in-flight exchange or start one. Resolves to the new access token.
    pub async fn refresh(&self) -> Option<String> {
        let refresh = {
            let mut slot = lock_slot(&self.inner.slot);
            match slot.as_ref() {
                Some(existing) => {
                    tracing::debug!("Joining in-flight credential refresh");
                    existing.refresh.clone()
                }
                None => {
                    let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
                    let (sender, receiver) = oneshot::channel();
                    let inner = self.inner.clone();

                    tokio::spawn(async move {
                        let token = inner.exchange().await;
                        {
                            let mut slot = lock_slot(&inner.slot);
                            if slot.as_ref().map(|s| s.generation) == Some(generation) {
                                *slot = None;
                            }
                        }
                        let _ = sender.send(token);
                    });

                    let refresh = receiver.map(|r| r.ok().flatten()).boxed().shared();
                    *slot = Some(Slot {
                        generation,
                        refresh: refresh.clone(),
                    });
                    refresh
                }
            }
        };
        refresh.await
    }

    /// Refresh after `rejected` was answered with 401.
    ///
    /// If the stored token already differs from the rejected one, another caller
    /// has refreshed in the meantime and the stored token is returned without a
    /// new exchange.
    pub async fn refresh_after_rejection(&self, rejected: Option<&str>) -> Option<String> {
        if let Some(current) = self.inner.store.access_token() {
            if rejected != Some(current.as_str()) {
                tracing::debug!("Credential already refreshed by another request");
                return Some(current);
            }
        }
        self.refresh().await
    }

    /// Drop stored credentials and tell listeners the session is gone.
    ///
    /// Listeners hear `Cleared` once per session: callers racing to clear the
    /// same credentials produce a single event. Returns whether anything was
    /// cleared.
    pub fn clear_credentials(&self) -> bool {
        let _guard = self
            .inner
            .clear_lock
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let store = &self.inner.store;
        if store.access_token().is_none() && store.refresh_token().is_none() {
            return false;
        }

        store.clear();
        let _ = self.inner.events.send(AuthEvent::Cleared);
        tracing::info!("Stored credentials cleared");
        true
    }
}

impl RefreshInner {
    async fn exchange(&self) -> Option<String> {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::debug!("No refresh token stored, skipping refresh");
            metrics::record_refresh("skipped");
            return None;
        };

        let request = OutgoingRequest {
            method: Method::POST,
            url: self.refresh_url.clone(),
            headers: Vec::new(),
            body: Some(json!({ "refreshToken": refresh_token })),
            bearer: None,
            request_id: Uuid::new_v4(),
        };

        let sent = with_timeout(self.attempt_timeout, self.transport.send(request)).await;
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Credential refresh request failed");
                metrics::record_refresh("failed");
                return None;
            }
        };

        if !(200..300).contains(&response.status) {
            tracing::warn!(status = response.status, "Credential refresh rejected");
            metrics::record_refresh("rejected");
            return None;
        }

        let pair = match serde_json::from_slice::<RefreshEnvelope>(&response.body) {
            Ok(RefreshEnvelope {
                success: true,
                data: Some(pair),
            }) if !pair.access_token.is_empty() => pair,
            Ok(_) => {
                tracing::warn!("Credential refresh response missing tokens");
                metrics::record_refresh("malformed");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Credential refresh response is not valid JSON");
                metrics::record_refresh("malformed");
                return None;
            }
        };

        if let Err(e) = self.store.store(&pair) {
            tracing::warn!(error = %e, "Failed to persist refreshed credentials");
        }
        self.store.invalidate_derived();
        let _ = self.events.send(AuthEvent::Refreshed);

        tracing::info!(expires_in = pair.expires_in, "Access token refreshed");
        metrics::record_refresh("success");
        Some(pair.access_token)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_url", &self.inner.refresh_url)
            .field("in_progress", &self.in_progress())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::MemoryCredentialStore;
    use crate::http::transport::{RawResponse, TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;

    struct RefreshEndpoint {
        calls: AtomicU32,
        status: u16,
        body: serde_json::Value,
    }

    #[async_trait]
    impl Transport for RefreshEndpoint {
        async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
            assert_eq!(request.body, Some(json!({"refreshToken": "r1"})));
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(RawResponse::json(self.status, &self.body))
        }
    }

    fn coordinator(
        status: u16,
        body: serde_json::Value,
    ) -> (RefreshCoordinator, Arc<RefreshEndpoint>, Arc<MemoryCredentialStore>) {
        let endpoint = Arc::new(RefreshEndpoint {
            calls: AtomicU32::new(0),
            status,
            body,
        });
        let store = Arc::new(MemoryCredentialStore::with_pair(&CredentialPair {
            access_token: "a1".into(),
            refresh_token: "r1".into(),
            expires_in: 0,
        }));
        let coordinator = RefreshCoordinator::new(
            endpoint.clone(),
            store.clone(),
            "http://api.test/api/auth/refresh".into(),
            Duration::from_secs(5),
        );
        (coordinator, endpoint, store)
    }

    fn success_body() -> serde_json::Value {
        json!({
            "success": true,
            "data": {"accessToken": "a2", "refreshToken": "r2", "expiresIn": 900}
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_share_one_exchange() {
        let (coordinator, endpoint, store) = coordinator(200, success_body());
        let mut events = coordinator.subscribe();

        let results =
            futures_util::future::join_all((0..4).map(|_| coordinator.refresh())).await;

        assert!(results.iter().all(|t| t.as_deref() == Some("a2")));
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
        assert_eq!(events.recv().await.unwrap(), AuthEvent::Refreshed);
        assert!(!coordinator.in_progress());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_cleared_after_failure() {
        let (coordinator, endpoint, _store) = coordinator(401, json!({"error": "expired"}));

        assert_eq!(coordinator.refresh().await, None);
        assert!(!coordinator.in_progress());
        assert_eq!(coordinator.refresh().await, None);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_body_yields_no_token() {
        let (coordinator, _endpoint, store) = coordinator(200, json!({"success": false}));
        assert_eq!(coordinator.refresh().await, None);
        assert_eq!(store.access_token().as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_skips_network() {
        let (coordinator, endpoint, store) = coordinator(200, success_body());
        store.clear();
        assert_eq!(coordinator.refresh().await, None);
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_of_stale_token_skips_exchange() {
        let (coordinator, endpoint, _store) = coordinator(200, success_body());
        let token = coordinator.refresh_after_rejection(Some("a0")).await;
        assert_eq!(token.as_deref(), Some("a1"));
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 0);

        let token = coordinator.refresh_after_rejection(Some("a1")).await;
        assert_eq!(token.as_deref(), Some("a2"));
        assert_eq!(endpoint.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_announces_once_per_session() {
        let (coordinator, _endpoint, store) = coordinator(200, success_body());
        let mut events = coordinator.subscribe();

        assert!(coordinator.clear_credentials());
        assert!(!coordinator.clear_credentials());
        assert!(!coordinator.clear_credentials());

        assert_eq!(store.access_token(), None);
        assert_eq!(events.recv().await.unwrap(), AuthEvent::Cleared);
        assert!(events.try_recv().is_err());
    }
}
