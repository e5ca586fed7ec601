//! Traits the engine depends on, and the default count cache.
//!
//! - [`StoreCapability`] - The four reads a backing store must support
//! - [`CountCache`] - Exact-count cache keyed by parameter map signature
//! - [`InMemoryCountCache`] - LRU + TTL implementation of [`CountCache`]
//! - [`CountCacheInvalidator`] - Hook for the store-mutation path

mod cache;
mod store;

pub use cache::{CountCache, CountCacheInvalidator, InMemoryCountCache, InvalidationSignal};
pub use store::{RelationshipQuery, StoreCapability};
