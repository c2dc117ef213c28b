//! TTL response cache.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::observability::metrics;

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub data: Value,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Eligible for reuse while `now - stored_at < ttl`.
    pub fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Snapshot returned by the cache administration surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// A thread-safe TTL cache keyed by request cache key.
///
/// Expired entries are evicted lazily on lookup and never returned.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    inner: Arc<DashMap<String, CachedEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a live entry's data.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        if let Some(entry) = self.inner.get(key) {
            if entry.is_live(now) {
                return Some(entry.data.clone());
            }
        }
        // Guard is released above; remove only if still expired.
        if self.inner.remove_if(key, |_, entry| !entry.is_live(now)).is_some() {
            tracing::trace!(key = %key, "Evicted expired cache entry");
            metrics::record_cache_size(self.inner.len());
        }
        None
    }

    pub fn insert(&self, key: String, data: Value, ttl: Duration) {
        self.inner.insert(
            key,
            CachedEntry {
                data,
                stored_at: Instant::now(),
                ttl,
            },
        );
        metrics::record_cache_size(self.inner.len());
    }

    pub fn remove(&self, key: &str) -> bool {
        let removed = self.inner.remove(key).is_some();
        metrics::record_cache_size(self.inner.len());
        removed
    }

    pub fn clear_all(&self) {
        self.inner.clear();
        metrics::record_cache_size(0);
    }

    /// Remove every entry whose key contains `pattern`. Returns the number removed.
    pub fn clear_pattern(&self, pattern: &str) -> usize {
        let before = self.inner.len();
        self.inner.retain(|key, _| !key.contains(pattern));
        let after = self.inner.len();
        metrics::record_cache_size(after);
        before.saturating_sub(after)
    }

    /// Evict every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        let after = self.inner.len();
        metrics::record_cache_size(after);
        before.saturating_sub(after)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.inner.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        CacheStats {
            size: keys.len(),
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::new();
        cache.insert("GET:/api/posts:".into(), json!([1, 2]), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get("GET:/api/posts:"), Some(json!([1, 2])));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("GET:/api/posts:"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ResponseCache::new();
        cache.insert("a".into(), json!(1), Duration::from_secs(10));
        cache.insert("b".into(), json!(2), Duration::from_secs(300));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.stats().keys, vec!["b".to_string()]);
    }

    #[test]
    fn test_clear_pattern_and_stats() {
        let cache = ResponseCache::new();
        cache.insert("GET:/api/campaigns:".into(), json!([]), Duration::from_secs(30));
        cache.insert("GET:/api/campaigns/7:".into(), json!({}), Duration::from_secs(30));
        cache.insert("GET:/api/posts:".into(), json!([]), Duration::from_secs(30));

        assert_eq!(cache.clear_pattern("campaigns"), 2);
        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.keys, vec!["GET:/api/posts:".to_string()]);

        cache.clear_all();
        assert_eq!(cache.stats().size, 0);
    }
}
