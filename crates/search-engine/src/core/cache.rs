//! Exact-count caching keyed by parameter map signature.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::CountCacheConfig;
use crate::error::CacheResult;

/// A key/value store for exact match counts.
///
/// Keys are [`ParameterMap::to_cache_signature`](crate::types::ParameterMap::to_cache_signature)
/// strings. Implementations may be process-local or shared; any error is
/// treated by the orchestrator as a cache miss.
#[async_trait]
pub trait CountCache: Send + Sync {
    /// Returns the cached count for a signature, if present and not expired.
    async fn get(&self, signature: &str) -> CacheResult<Option<u64>>;

    /// Stores a count for `ttl`.
    async fn put(&self, signature: &str, count: u64, ttl: Duration) -> CacheResult<()>;

    /// Removes one signature.
    async fn invalidate(&self, signature: &str) -> CacheResult<()>;

    /// Removes every cached count.
    async fn invalidate_all(&self) -> CacheResult<()>;
}

#[derive(Debug, Clone, Copy)]
struct CachedCount {
    value: u64,
    expires_at: Instant,
}

/// A process-local [`CountCache`] bounded by capacity and per-entry TTL.
///
/// The least recently used signature is evicted when full. Expiry is
/// measured on the tokio clock.
pub struct InMemoryCountCache {
    entries: Mutex<LruCache<String, CachedCount>>,
}

impl InMemoryCountCache {
    /// Creates a cache holding at most `capacity` signatures.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Creates a cache sized from configuration.
    pub fn from_config(config: &CountCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity)
    }

    /// Returns the number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops all expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }
}

impl fmt::Debug for InMemoryCountCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("InMemoryCountCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

#[async_trait]
impl CountCache for InMemoryCountCache {
    async fn get(&self, signature: &str) -> CacheResult<Option<u64>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let lookup = entries
            .get(signature)
            .map(|entry| (entry.value, entry.expires_at > now));

        match lookup {
            Some((value, true)) => Ok(Some(value)),
            Some((_, false)) => {
                entries.pop(signature);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, signature: &str, count: u64, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        // Overflowing TTLs are capped at roughly thirty years.
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 30));

        self.entries.lock().put(
            signature.to_string(),
            CachedCount {
                value: count,
                expires_at,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, signature: &str) -> CacheResult<()> {
        self.entries.lock().pop(signature);
        Ok(())
    }

    async fn invalidate_all(&self) -> CacheResult<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// What to drop from the count cache after a store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationSignal {
    /// Drop a single signature.
    Signature(String),
    /// Drop everything.
    All,
}

/// A cloneable handle the store-mutation path uses to invalidate counts.
#[derive(Clone)]
pub struct CountCacheInvalidator {
    cache: Arc<dyn CountCache>,
}

impl CountCacheInvalidator {
    /// Creates an invalidator for the given cache.
    pub fn new(cache: Arc<dyn CountCache>) -> Self {
        Self { cache }
    }

    /// Applies one invalidation signal.
    pub async fn signal(&self, signal: InvalidationSignal) -> CacheResult<()> {
        match signal {
            InvalidationSignal::Signature(signature) => {
                tracing::debug!("Invalidating cached count for {}", signature);
                self.cache.invalidate(&signature).await
            }
            InvalidationSignal::All => {
                tracing::debug!("Invalidating all cached counts");
                self.cache.invalidate_all().await
            }
        }
    }

    /// Invalidates counts after a resource of `resource_type` was written.
    ///
    /// A write can change the count of any search touching that type
    /// through chained or reverse constraints, so everything is dropped.
    pub async fn resource_changed(&self, resource_type: &str) -> CacheResult<()> {
        tracing::debug!(
            "{} changed, invalidating all cached counts",
            resource_type
        );
        self.cache.invalidate_all().await
    }

    /// Applies signals from a channel until every sender is dropped.
    ///
    /// Failures are logged and the loop keeps going.
    pub async fn listen(self, mut signals: mpsc::Receiver<InvalidationSignal>) {
        while let Some(signal) = signals.recv().await {
            if let Err(e) = self.signal(signal).await {
                tracing::warn!("Failed to apply count cache invalidation: {}", e);
            }
        }
        tracing::debug!("Count cache invalidation channel closed");
    }
}

impl fmt::Debug for CountCacheInvalidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountCacheInvalidator").finish_non_exhaustive()
    }
}
