//! Helios FHIR Server Search Engine
//!
//! This crate translates a FHIR search request into calls against a pluggable
//! backing store, paginates the matches and expands them along `_include` and
//! `_revinclude` relationships without ever returning a resource twice.
//!
//! # Features
//!
//! - **Uniform constraints**: Any handler-keyed set of search parameters in one [`ParameterMap`]
//! - **Narrow store contract**: Four independent reads behind [`StoreCapability`]
//! - **Exact or derived totals**: Counts are only computed when asked for
//! - **Count caching**: Read-through [`CountCache`] with TTL and explicit invalidation
//! - **Bounded expansion**: Forward and reverse includes with at most one `:iterate` hop
//! - **Tie-aware ranking**: "Last N" selection that never splits a tie
//!
//! # Architecture
//!
//! - [`types`] - Parameter maps, include specs, pagination and result types
//! - [`core`] - Store and count cache traits, the in-memory count cache
//! - [`engine`] - The search orchestrator and graph expander
//! - [`ranking`] - Tie-inclusive top-N ranking
//! - [`config`] - Engine configuration
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```no_run
//! use helios_search_engine::config::SearchEngineConfig;
//! use helios_search_engine::engine::SearchOrchestrator;
//! use helios_search_engine::types::{
//!     ConstraintValue, HandlerKey, IncludeSpec, PageRequest, ParameterMap,
//! };
//!
//! # async fn run<S: helios_search_engine::StoreCapability>(store: S) -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = SearchOrchestrator::with_default_cache(SearchEngineConfig::default());
//!
//! let map = ParameterMap::builder("Observation")
//!     .add_parameter(
//!         HandlerKey::PATIENT_REFERENCE,
//!         "patient",
//!         ConstraintValue::reference("Patient", "123"),
//!     )
//!     .add_include(IncludeSpec::parse_include("Observation:subject:Patient", false)?)
//!     .build()?;
//!
//! let page = PageRequest::first_page(20)?.with_exact_total();
//! let result = orchestrator.execute(&map, &store, page).await?;
//!
//! for entry in result.entries() {
//!     println!("{:?} {}", entry.mode, entry.resource_type);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Counting Only
//!
//! A `_summary=count` request resolves the total without fetching a single
//! record:
//!
//! ```
//! use helios_search_engine::types::PageRequest;
//!
//! let page = PageRequest::first_page(20).unwrap().count_only();
//! assert!(page.summary_count_only);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod ranking;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{CountCacheConfig, SearchEngineConfig};
pub use error::{EngineError, EngineResult};
pub use types::{ExpandedResultSet, PageRequest, ParameterMap, RecordId, StoredRecord};

// Re-export core traits
pub use core::{CountCache, InMemoryCountCache, StoreCapability};

pub use engine::{GraphExpander, SearchOrchestrator};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
