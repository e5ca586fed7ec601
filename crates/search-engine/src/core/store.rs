//! The backing store contract.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{IncludeDirection, ParameterMap, RecordId, StoredRecord};

/// One relationship walk requested by the graph expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipQuery<'a> {
    /// The type of the anchor identifiers.
    pub anchor_type: &'a str,

    /// The type of the records to find.
    pub related_type: &'a str,

    /// The relationship field linking the two types.
    pub search_param: &'a str,

    /// Forward (anchors reference related) or reverse (related reference anchors).
    pub direction: IncludeDirection,
}

/// The minimal capability a backing store must provide to the engine.
///
/// All methods are independent reads. The store owns transactions, timeouts,
/// retries and authorization filtering; every identifier it returns is
/// assumed to be visible to the caller. Type-specific behaviour (how a
/// handler key becomes criteria, how a relationship maps to a join) lives
/// entirely in the implementation.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use helios_search_engine::core::{RelationshipQuery, StoreCapability};
/// use helios_search_engine::error::StoreResult;
/// use helios_search_engine::types::{ParameterMap, RecordId};
///
/// struct ClinicalStore { /* connection pool, criteria builders */ }
///
/// #[async_trait]
/// impl StoreCapability for ClinicalStore {
///     type Record = ClinicalRecord;
///
///     fn backend_name(&self) -> &'static str {
///         "clinical-db"
///     }
///
///     async fn count(&self, map: &ParameterMap) -> StoreResult<u64> {
///         // SELECT COUNT(DISTINCT id) ... built from map.entries()
///         todo!()
///     }
///
///     // ... fetch_window, hydrate, fetch_related
/// }
/// ```
#[async_trait]
pub trait StoreCapability: Send + Sync {
    /// The hydrated domain record type.
    type Record: StoredRecord;

    /// Returns a short name for this store, used in diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Counts all records matching the map.
    async fn count(&self, map: &ParameterMap) -> StoreResult<u64>;

    /// Returns the identifiers of matches `first..last` in result order.
    ///
    /// The order must be stable for a fixed store snapshot.
    async fn fetch_window(
        &self,
        map: &ParameterMap,
        first: usize,
        last: usize,
    ) -> StoreResult<Vec<RecordId>>;

    /// Loads the records for the given identifiers of one resource type.
    ///
    /// The returned order is not significant; identifiers that no longer
    /// resolve may be left out.
    async fn hydrate(
        &self,
        resource_type: &str,
        ids: &[RecordId],
    ) -> StoreResult<Vec<Self::Record>>;

    /// Returns identifiers of `query.related_type` linked to the anchors.
    ///
    /// Results should follow anchor order; duplicates are allowed and are
    /// removed by the expander. A relationship the store does not know must
    /// be reported as [`StoreError::UnknownRelationship`](crate::error::StoreError::UnknownRelationship).
    async fn fetch_related(
        &self,
        query: &RelationshipQuery<'_>,
        anchors: &[RecordId],
    ) -> StoreResult<Vec<RecordId>>;
}
