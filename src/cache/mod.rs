//! Two-tier tagged cache shared by the fetcher (raw downstream documents)
//! and the pipeline (aggregated per-service documents).
//!
//! Both tiers live in one [`AggregationCache`] instance, distinguished only
//! by key prefix and tags. Concurrent callers for the same key are
//! coalesced via a `DashMap` of `OnceCell`s so exactly one computation runs
//! per key (§4.9, invariant 9 in the spec).

use dashmap::DashMap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

/// A cached value: `None` represents a cached failure (used to shield
/// failing downstreams without hammering them on every request).
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<Vec<u8>>,
    tags: HashSet<String>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

type InflightCell = Arc<OnceCell<Option<Vec<u8>>>>;

/// The shared cache store. Cheap to clone (everything is `Arc`-backed
/// internally via `DashMap`), so it can be passed around by value.
#[derive(Default)]
pub struct AggregationCache {
    store: DashMap<String, CacheEntry>,
    tag_index: DashMap<String, HashSet<String>>,
    inflight: DashMap<String, InflightCell>,
}

impl AggregationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, ignoring and evicting it if expired. Returns `None`
    /// both for a miss and for a cached failure sentinel — use
    /// [`Self::get_or_compute`] when the distinction matters.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entry = self.store.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.remove(key);
            return None;
        }
        entry.value.clone()
    }

    /// Insert a value (or failure sentinel, if `value` is `None`) under
    /// `key` with the given TTL and tags. Values larger than `max_payload`
    /// bytes are not stored; the caller still gets to use the value it
    /// already computed.
    pub fn set(&self, key: &str, value: Option<Vec<u8>>, ttl: Duration, tags: &[&str], max_payload: usize) {
        if let Some(v) = &value {
            if v.len() > max_payload {
                tracing::warn!(key = %key, size = v.len(), max_payload, "skipping cache insert: payload too large");
                return;
            }
        }

        let tag_set: HashSet<String> = tags.iter().map(|t| t.to_string()).collect();
        for tag in &tag_set {
            self.tag_index.entry(tag.clone()).or_default().insert(key.to_string());
        }

        self.store.insert(key.to_string(), CacheEntry { value, tags: tag_set, expires_at: Instant::now() + ttl });
    }

    fn remove(&self, key: &str) {
        if let Some((_, entry)) = self.store.remove(key) {
            for tag in entry.tags {
                if let Some(mut keys) = self.tag_index.get_mut(&tag) {
                    keys.remove(key);
                }
            }
        }
    }

    /// Remove every entry carrying `tag`.
    pub fn invalidate_tag(&self, tag: &str) {
        if let Some((_, keys)) = self.tag_index.remove(tag) {
            for key in keys {
                self.store.remove(&key);
            }
        }
    }

    /// Remove everything.
    pub fn invalidate_all(&self) {
        self.store.clear();
        self.tag_index.clear();
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Single-flight get-or-compute: concurrent callers for the same `key`
    /// share one execution of `compute`. The computed value (success or
    /// failure) is cached with `ttl` (success) or `failure_ttl` (failure)
    /// before being handed to every waiter.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        failure_ttl: Duration,
        tags: &[&str],
        max_payload: usize,
        compute: F,
    ) -> Option<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Vec<u8>>>,
    {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                return entry.value.clone();
            }
        }

        let cell = self.inflight.entry(key.to_string()).or_insert_with(|| Arc::new(OnceCell::new())).clone();

        let result = cell
            .get_or_init(|| async {
                let value = compute().await;
                let ttl = if value.is_some() { ttl } else { failure_ttl };
                self.set(key, value.clone(), ttl, tags, max_payload);
                value
            })
            .await
            .clone();

        self.inflight.remove_if(key, |_, v| Arc::ptr_eq(v, &cell));

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn set_and_get_round_trip() {
        let cache = AggregationCache::new();
        cache.set("k1", Some(b"hello".to_vec()), Duration::from_secs(60), &["tag"], 1024);
        assert_eq!(cache.get("k1"), Some(b"hello".to_vec()));
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = AggregationCache::new();
        cache.set("k1", Some(b"hello".to_vec()), Duration::from_millis(0), &[], 1024);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn payloads_over_ceiling_are_not_cached() {
        let cache = AggregationCache::new();
        cache.set("k1", Some(vec![0u8; 100]), Duration::from_secs(60), &[], 10);
        assert_eq!(cache.get("k1"), None);
    }

    #[test]
    fn invalidate_tag_removes_only_tagged_entries() {
        let cache = AggregationCache::new();
        cache.set("k1", Some(b"a".to_vec()), Duration::from_secs(60), &["service:users"], 1024);
        cache.set("k2", Some(b"b".to_vec()), Duration::from_secs(60), &["service:products"], 1024);
        cache.invalidate_tag("service:users");
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.get("k2"), Some(b"b".to_vec()));
    }

    #[test]
    fn invalidate_all_clears_everything() {
        let cache = AggregationCache::new();
        cache.set("k1", Some(b"a".to_vec()), Duration::from_secs(60), &["x"], 1024);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_get_or_compute_runs_exactly_once() {
        let cache = Arc::new(AggregationCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("shared-key", Duration::from_secs(60), Duration::from_secs(5), &[], 1024, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Some(b"value".to_vec())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(b"value".to_vec()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_cached_with_their_own_ttl() {
        let cache = AggregationCache::new();
        let result = cache
            .get_or_compute("k1", Duration::from_secs(60), Duration::from_secs(60), &[], 1024, || async { None })
            .await;
        assert_eq!(result, None);
        // still a real (failure) cache entry, not a miss, before it expires
        assert!(cache.store.contains_key("k1"));
    }
}
