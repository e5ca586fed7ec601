//! Test infrastructure for the search engine.
//!
//! Provides a recording in-memory store, cache doubles, and helpers shared
//! by the integration tests.

#![allow(dead_code)]

pub mod caches;
pub mod fixtures;

// Re-export commonly used items
pub use caches::*;
pub use fixtures::*;
