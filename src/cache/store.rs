use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::cache::CacheKey;
use crate::error::AppResult;

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
    /// Position in insertion order
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    insertion_order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl CacheInner {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.insertion_order.remove(&entry.seq);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.insertion_order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// Point-in-time view of the cache for admin and health endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_seconds: u64,
}

/// In-memory, time-expiring, size-bounded memoization store
///
/// Shared process-wide behind an `Arc`. Values are kept as JSON so any
/// serializable result can be memoized. When full, the oldest inserted entry
/// is evicted to make room, regardless of how recently it was read.
pub struct Cache {
    inner: Mutex<CacheInner>,
    /// One gate per key currently being computed
    in_flight: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    max_size: usize,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            in_flight: DashMap::new(),
            max_size,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the memoized value for `key`, computing and storing it on a miss
    ///
    /// Concurrent callers for the same key wait for the first computation and
    /// then read its result, so `compute` runs at most once per fresh entry.
    /// Errors from `compute` are returned and nothing is stored.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let digest = key.digest();

        if let Some(value) = self.get(&digest)? {
            tracing::debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        let gate = self
            .in_flight
            .entry(digest.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        let result = {
            let _guard = gate.lock().await;
            self.fill(&digest, key, ttl, compute).await
        };

        // Drop the gate once nobody else is queued on it
        self.in_flight
            .remove_if(&digest, |_, g| Arc::strong_count(g) <= 2);

        result
    }

    async fn fill<T, F, Fut>(
        &self,
        digest: &str,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        // Another caller may have filled the entry while we waited
        if let Some(value) = self.get(digest)? {
            tracing::debug!(key = %key, "Cache hit after wait");
            return Ok(value);
        }

        tracing::debug!(key = %key, "Cache miss");
        let value = compute().await?;
        self.insert(digest.to_string(), &value, ttl)?;
        Ok(value)
    }

    /// Reads a live entry, dropping it if it has expired
    fn get<T: DeserializeOwned>(&self, digest: &str) -> AppResult<Option<T>> {
        let value = {
            let mut inner = self.lock();
            let now = Instant::now();

            match inner.entries.get(digest) {
                Some(entry) if entry.is_expired(now) => {
                    inner.remove(digest);
                    None
                }
                Some(entry) => Some(entry.value.clone()),
                None => None,
            }
        };

        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn insert<T: Serialize>(&self, digest: String, value: &T, ttl: Duration) -> AppResult<()> {
        let value = serde_json::to_value(value)?;

        if self.max_size == 0 {
            return Ok(());
        }

        let mut inner = self.lock();

        if inner.remove(&digest).is_none() && inner.entries.len() >= self.max_size {
            if let Some(evicted) = inner.evict_oldest() {
                tracing::debug!(key = %evicted, max_size = self.max_size, "Evicted oldest cache entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.insertion_order.insert(seq, digest.clone());
        inner.entries.insert(
            digest,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl,
                seq,
            },
        );

        Ok(())
    }

    /// Removes every entry
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.insertion_order.clear();
        tracing::info!("Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            ttl_seconds: self.default_ttl.as_secs(),
        }
    }
}
