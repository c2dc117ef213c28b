//! In-flight request registry.
//!
//! Concurrent callers with the same key share one spawned computation. The
//! computation runs on its own task, so it completes even if every caller
//! stops waiting, and it removes its registry entry before publishing the
//! result. Callers therefore either join a computation that will deliver, or
//! start a new one.

use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{ApiError, ApiResult};

/// Shared handle to one in-flight request's result.
pub type PendingResult = Shared<BoxFuture<'static, ApiResult<Value>>>;

/// Whether the caller joined an existing request or started a new one.
pub enum Pending {
    Joined(PendingResult),
    Started(PendingResult),
}

impl Pending {
    pub fn is_joined(&self) -> bool {
        matches!(self, Pending::Joined(_))
    }

    pub fn into_future(self) -> PendingResult {
        match self {
            Pending::Joined(f) | Pending::Started(f) => f,
        }
    }
}

/// Removes a key from the registry when dropped, including on panic.
struct RemoveOnDrop {
    inflight: Arc<DashMap<String, PendingResult>>,
    key: String,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
    }
}

#[derive(Clone, Default)]
pub struct PendingRegistry {
    inflight: Arc<DashMap<String, PendingResult>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight request for `key`, or spawn `start()` as a new one.
    ///
    /// `start` is only called when no request is in flight for `key`.
    pub fn join_or_start<F, Fut>(&self, key: &str, start: F) -> Pending
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        match self.inflight.entry(key.to_string()) {
            Entry::Occupied(entry) => Pending::Joined(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (sender, receiver) = oneshot::channel();
                let guard = RemoveOnDrop {
                    inflight: self.inflight.clone(),
                    key: key.to_string(),
                };
                let work = start();

                tokio::spawn(async move {
                    let result = work.await;
                    drop(guard);
                    let _ = sender.send(result);
                });

                let shared = receiver
                    .map(|received| {
                        received.unwrap_or_else(|_| {
                            Err(ApiError::Transient {
                                status: None,
                                message: "request task terminated before completing".to_string(),
                            })
                        })
                    })
                    .boxed()
                    .shared();

                entry.insert(shared.clone());
                Pending::Started(shared)
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inflight.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }
}

impl std::fmt::Debug for PendingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRegistry")
            .field("inflight", &self.inflight.len())
            .finish()
    }
}
