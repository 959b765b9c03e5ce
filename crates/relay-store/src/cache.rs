// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Key-value cache surface.
//!
//! The backing store is external (and shared across processes); this module
//! defines the trait the core programs against, plus an in-process LRU
//! implementation and a failing double for degradation tests.
//!
//! The cardinal rule of the cache layer: **backend errors never fail the
//! caller**.  [`cache_query`] reads through the cache and falls back to the
//! live query on any cache trouble.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::StoreError;

/// Object-safe cache surface storing JSON values.
///
/// Typed access goes through [`cache_query`] and the [`get_typed`] helper,
/// which (de)serialize at the boundary so the trait stays object-safe.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError>;
    /// Returns `true` when the value was stored.
    async fn set_value(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;
    /// Returns `true` when a value was present and removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
    async fn has(&self, key: &str) -> Result<bool, StoreError>;
}

/// Typed read; deserialization failures count as a miss (stale schema).
pub async fn get_typed<T: DeserializeOwned>(
    cache: &dyn Cache,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match cache.get_value(key).await? {
        Some(v) => Ok(serde_json::from_value(v).ok()),
        None => Ok(None),
    }
}

/// Options for [`cache_query`].
#[derive(Debug, Clone, Copy)]
pub struct CacheQueryOptions {
    pub ttl: Option<Duration>,
    /// When `true` (default), a `None` result from the live query is not
    /// written back, so the next call retries the query.
    pub skip_if_none: bool,
}

impl Default for CacheQueryOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            skip_if_none: true,
        }
    }
}

/// Read-through cache query.
///
/// Reads `key` first; on a hit the cached value is returned without running
/// `query`.  On a miss, `query` runs; a non-`None` result (or any result
/// when `skip_if_none` is off) is written back with the TTL.  Cache backend
/// errors – on read or write – are logged and treated as a miss: the caller
/// always gets the live result in that case.  Errors from `query` itself
/// propagate untouched.
pub async fn cache_query<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    opts: CacheQueryOptions,
    query: F,
) -> Result<Option<T>, StoreError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, StoreError>>,
{
    match cache.get_value(key).await {
        Ok(Some(v)) => {
            if let Ok(typed) = serde_json::from_value::<T>(v) {
                return Ok(Some(typed));
            }
            // Undeserializable cached value: treat as a miss and overwrite below.
            debug!(key, "cached value failed to deserialize; treating as miss");
        }
        Ok(None) => {}
        Err(e) => {
            debug!(key, error = %e, "cache read failed; falling back to live query");
        }
    }

    let result = query().await?;

    let should_write = result.is_some() || !opts.skip_if_none;
    if should_write {
        let value = match &result {
            Some(t) => match serde_json::to_value(t) {
                Ok(v) => v,
                Err(_) => return Ok(result),
            },
            None => Value::Null,
        };
        if let Err(e) = cache.set_value(key, value, opts.ttl).await {
            debug!(key, error = %e, "cache write failed; returning live result");
        }
    }
    Ok(result)
}

// ─── In-memory implementation ─────────────────────────────────────────────────

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

/// Bounded in-process cache: LRU eviction plus per-entry TTL expiry.
pub struct MemoryCache {
    entries: Mutex<lru::LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(lru::LruCache::new(cap)),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let expired = match entries.get(key) {
            Some(e) => e.expires_at.is_some_and(|t| Instant::now() >= t),
            None => return Ok(None),
        };
        if expired {
            entries.pop(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn set_value(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let entry = Entry {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.entries.lock().unwrap().put(key.to_string(), entry);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().unwrap().pop(key).is_some())
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        self.get_value(key).await.map(|v| v.is_some())
    }
}

/// Test double whose every operation fails with a backend error, for
/// verifying that callers degrade rather than propagate cache trouble.
#[derive(Default)]
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get_value(&self, _key: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Backend("cache unavailable".into()))
    }
    async fn set_value(
        &self,
        _key: &str,
        _value: Value,
        _ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Backend("cache unavailable".into()))
    }
    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Backend("cache unavailable".into()))
    }
    async fn has(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Backend("cache unavailable".into()))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let c = MemoryCache::default();
        assert!(c.set_value("k", json!({"a": 1}), None).await.unwrap());
        assert_eq!(c.get_value("k").await.unwrap(), Some(json!({"a": 1})));
        assert!(c.has("k").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let c = MemoryCache::default();
        c.set_value("k", json!(1), None).await.unwrap();
        assert!(c.delete("k").await.unwrap());
        assert!(!c.delete("k").await.unwrap());
        assert_eq!(c.get_value("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let c = MemoryCache::default();
        c.set_value("k", json!(1), Some(Duration::from_millis(5)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(c.get_value("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lru_evicts_oldest_beyond_capacity() {
        let c = MemoryCache::new(2);
        c.set_value("a", json!(1), None).await.unwrap();
        c.set_value("b", json!(2), None).await.unwrap();
        c.set_value("c", json!(3), None).await.unwrap();
        assert_eq!(c.get_value("a").await.unwrap(), None);
        assert!(c.has("c").await.unwrap());
    }

    #[tokio::test]
    async fn cache_query_miss_runs_query_and_writes_back() {
        let c = MemoryCache::default();
        let out: Option<u32> = cache_query(&c, "n", CacheQueryOptions::default(), || async {
            Ok(Some(7u32))
        })
        .await
        .unwrap();
        assert_eq!(out, Some(7));
        assert_eq!(c.get_value("n").await.unwrap(), Some(json!(7)));
    }

    #[tokio::test]
    async fn cache_query_hit_skips_query() {
        let c = MemoryCache::default();
        c.set_value("n", json!(1), None).await.unwrap();
        let out: Option<u32> = cache_query(&c, "n", CacheQueryOptions::default(), || async {
            panic!("query must not run on a cache hit")
        })
        .await
        .unwrap();
        assert_eq!(out, Some(1));
    }

    #[tokio::test]
    async fn cache_query_skips_write_of_none_by_default() {
        let c = MemoryCache::default();
        let out: Option<u32> =
            cache_query(&c, "n", CacheQueryOptions::default(), || async { Ok(None) })
                .await
                .unwrap();
        assert_eq!(out, None);
        assert!(!c.has("n").await.unwrap());
    }

    #[tokio::test]
    async fn cache_query_survives_failing_backend() {
        let c = FailingCache;
        let out: Option<u32> = cache_query(&c, "n", CacheQueryOptions::default(), || async {
            Ok(Some(42u32))
        })
        .await
        .unwrap();
        assert_eq!(out, Some(42), "backend errors must degrade, not fail");
    }

    #[tokio::test]
    async fn cache_query_propagates_query_errors() {
        let c = MemoryCache::default();
        let out: Result<Option<u32>, _> =
            cache_query(&c, "n", CacheQueryOptions::default(), || async {
                Err(StoreError::NotFound("row".into()))
            })
            .await;
        assert!(matches!(out, Err(StoreError::NotFound(_))));
    }
}
