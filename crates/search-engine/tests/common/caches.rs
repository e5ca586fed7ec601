//! Count cache doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use helios_search_engine::core::{CountCache, InMemoryCountCache};
use helios_search_engine::error::{CacheError, CacheResult};

/// A cache whose backend is always down.
#[derive(Debug, Default)]
pub struct UnavailableCache {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl CountCache for UnavailableCache {
    async fn get(&self, _signature: &str) -> CacheResult<Option<u64>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable {
            message: "connection refused".to_string(),
        })
    }

    async fn put(&self, _signature: &str, _count: u64, _ttl: Duration) -> CacheResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable {
            message: "connection refused".to_string(),
        })
    }

    async fn invalidate(&self, _signature: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable {
            message: "connection refused".to_string(),
        })
    }

    async fn invalidate_all(&self) -> CacheResult<()> {
        Err(CacheError::Unavailable {
            message: "connection refused".to_string(),
        })
    }
}

/// An in-memory cache that records the TTLs and signatures it was given.
#[derive(Debug)]
pub struct RecordingCache {
    inner: InMemoryCountCache,
    pub puts: parking_lot::Mutex<Vec<(String, u64, Duration)>>,
    pub gets: AtomicUsize,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self {
            inner: InMemoryCountCache::new(std::num::NonZeroUsize::new(64).unwrap()),
            puts: parking_lot::Mutex::new(Vec::new()),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn put_signatures(&self) -> Vec<String> {
        self.puts.lock().iter().map(|(s, _, _)| s.clone()).collect()
    }
}

#[async_trait]
impl CountCache for RecordingCache {
    async fn get(&self, signature: &str) -> CacheResult<Option<u64>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(signature).await
    }

    async fn put(&self, signature: &str, count: u64, ttl: Duration) -> CacheResult<()> {
        self.puts.lock().push((signature.to_string(), count, ttl));
        self.inner.put(signature, count, ttl).await
    }

    async fn invalidate(&self, signature: &str) -> CacheResult<()> {
        self.inner.invalidate(signature).await
    }

    async fn invalidate_all(&self) -> CacheResult<()> {
        self.inner.invalidate_all().await
    }
}
