//! Core types for the search engine.
//!
//! - [`ParameterMap`] - The immutable set of search constraints for a request
//! - [`IncludeSpec`], [`IncludeSet`] - Forward and reverse include requests
//! - [`PageRequest`], [`ResultWindow`], [`TotalCount`] - Pagination
//! - [`ExpandedResultSet`] - Primary matches plus expanded related records
//! - [`RecordId`], [`StoredRecord`] - Record identity
//!
//! # Building a Parameter Map
//!
//! ```
//! use helios_search_engine::types::{
//!     ConstraintValue, HandlerKey, IncludeSpec, ParameterMap, SortDirective,
//! };
//!
//! let map = ParameterMap::builder("Observation")
//!     .add_parameter(
//!         HandlerKey::PATIENT_REFERENCE,
//!         "patient",
//!         ConstraintValue::reference("Patient", "123"),
//!     )
//!     .add_parameter(HandlerKey::CODED, "code", ConstraintValue::code("8867-4"))
//!     .add_sort(SortDirective::parse("-date"))
//!     .add_include(IncludeSpec::parse_include("Observation:subject:Patient", false).unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(map.entries().len(), 2);
//! assert!(map.has_includes());
//! ```

mod include;
mod pagination;
mod parameter_map;
mod record;
mod result;

pub use include::{IncludeDirection, IncludeKey, IncludeSet, IncludeSpec};

pub use pagination::{PageRequest, ResultWindow, TotalCount};

pub use parameter_map::{
    ConstraintValue, HandlerKey, ParameterEntry, ParameterMap, ParameterMapBuilder, SearchPrefix,
    SortDirection, SortDirective,
};

pub use record::{RecordId, StoredRecord};

pub use result::{ExpandedResultSet, RelatedBucket, ResultEntry, SearchEntryMode};
