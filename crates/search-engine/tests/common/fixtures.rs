//! A recording in-memory store and helpers for building requests.
//!
//! [`FixtureStore`] answers the four store reads from fixed data and records
//! every call so tests can assert on exactly which reads the engine made.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use helios_search_engine::core::{RelationshipQuery, StoreCapability};
use helios_search_engine::error::{StoreError, StoreResult};
use helios_search_engine::types::{
    ConstraintValue, HandlerKey, IncludeDirection, IncludeSpec, ParameterMap, RecordId,
    StoredRecord,
};

/// A hydrated fixture record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalRecord {
    /// Resource type.
    pub resource_type: String,
    /// Store identifier.
    pub id: RecordId,
}

impl StoredRecord for ClinicalRecord {
    fn record_id(&self) -> RecordId {
        self.id
    }
}

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `count`
    Count { resource_type: String },
    /// `fetch_window`
    FetchWindow {
        resource_type: String,
        first: usize,
        last: usize,
    },
    /// `hydrate`
    Hydrate {
        resource_type: String,
        ids: Vec<RecordId>,
    },
    /// `fetch_related`
    FetchRelated {
        anchor_type: String,
        related_type: String,
        search_param: String,
        direction: IncludeDirection,
        anchors: Vec<RecordId>,
    },
}

impl StoreCall {
    /// Returns the store method name.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreCall::Count { .. } => "count",
            StoreCall::FetchWindow { .. } => "fetch_window",
            StoreCall::Hydrate { .. } => "hydrate",
            StoreCall::FetchRelated { .. } => "fetch_related",
        }
    }
}

/// Which store call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Count,
    FetchWindow,
    Hydrate,
    FetchRelated,
}

type EdgeKey = (String, String, IncludeDirection);

/// An in-memory [`StoreCapability`] over fixed matches and edges.
///
/// Matches are listed per resource type in result order. A
/// `HandlerKey::RESOURCE_ID` string constraint restricts matches to the given
/// identifiers. Edges are keyed by anchor type, search parameter and
/// direction; a relationship with no edges registered is unknown.
#[derive(Default)]
pub struct FixtureStore {
    matches: HashMap<String, Vec<RecordId>>,
    edges: HashMap<EdgeKey, HashMap<RecordId, Vec<RecordId>>>,
    unhydratable: HashSet<(String, RecordId)>,
    repeat_window: bool,
    fail_on: Option<FailPoint>,
    calls: Mutex<Vec<StoreCall>>,
}

impl FixtureStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ordered matches for a resource type.
    pub fn with_matches(mut self, resource_type: &str, ids: &[u64]) -> Self {
        self.matches.insert(resource_type.to_string(), record_ids(ids));
        self
    }

    /// Adds an edge: walking `search_param` from `anchor` of `anchor_type`
    /// in `direction` yields `targets`.
    pub fn with_edge(
        mut self,
        anchor_type: &str,
        search_param: &str,
        direction: IncludeDirection,
        anchor: u64,
        targets: &[u64],
    ) -> Self {
        self.edges
            .entry((anchor_type.to_string(), search_param.to_string(), direction))
            .or_default()
            .insert(RecordId::new(anchor), record_ids(targets));
        self
    }

    /// Adds a forward reference edge.
    pub fn with_reference(
        self,
        anchor_type: &str,
        search_param: &str,
        anchor: u64,
        targets: &[u64],
    ) -> Self {
        self.with_edge(anchor_type, search_param, IncludeDirection::Forward, anchor, targets)
    }

    /// Adds a reverse reference edge: `referrers` point at `anchor`.
    pub fn with_referrers(
        self,
        anchor_type: &str,
        search_param: &str,
        anchor: u64,
        referrers: &[u64],
    ) -> Self {
        self.with_edge(anchor_type, search_param, IncludeDirection::Reverse, anchor, referrers)
    }

    /// Makes a record fail to hydrate, as if it were deleted between calls.
    pub fn with_unhydratable(mut self, resource_type: &str, id: u64) -> Self {
        self.unhydratable
            .insert((resource_type.to_string(), RecordId::new(id)));
        self
    }

    /// Makes `fetch_window` return every identifier twice.
    pub fn with_repeated_window(mut self) -> Self {
        self.repeat_window = true;
        self
    }

    /// Makes one kind of call fail.
    pub fn failing_on(mut self, point: FailPoint) -> Self {
        self.fail_on = Some(point);
        self
    }

    /// Returns every recorded call in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Returns how many calls of a kind were made.
    pub fn call_count(&self, kind: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.kind() == kind).count()
    }

    /// Forgets recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }

    fn check(&self, point: FailPoint) -> StoreResult<()> {
        if self.fail_on == Some(point) {
            return Err(StoreError::Unavailable {
                backend_name: self.backend_name().to_string(),
                message: format!("{:?} failed", point),
            });
        }
        Ok(())
    }

    fn matching(&self, map: &ParameterMap) -> Vec<RecordId> {
        let all = self
            .matches
            .get(map.resource_type())
            .cloned()
            .unwrap_or_default();

        let allowed: HashSet<RecordId> = map
            .entries_for(HandlerKey::RESOURCE_ID)
            .filter_map(|entry| match &entry.value {
                ConstraintValue::String { value } => value.parse().ok().map(RecordId::new),
                _ => None,
            })
            .collect();

        if allowed.is_empty() {
            all
        } else {
            all.into_iter().filter(|id| allowed.contains(id)).collect()
        }
    }
}

#[async_trait]
impl StoreCapability for FixtureStore {
    type Record = ClinicalRecord;

    fn backend_name(&self) -> &'static str {
        "fixture"
    }

    async fn count(&self, map: &ParameterMap) -> StoreResult<u64> {
        self.record(StoreCall::Count {
            resource_type: map.resource_type().to_string(),
        });
        self.check(FailPoint::Count)?;
        Ok(self.matching(map).len() as u64)
    }

    async fn fetch_window(
        &self,
        map: &ParameterMap,
        first: usize,
        last: usize,
    ) -> StoreResult<Vec<RecordId>> {
        self.record(StoreCall::FetchWindow {
            resource_type: map.resource_type().to_string(),
            first,
            last,
        });
        self.check(FailPoint::FetchWindow)?;

        let window: Vec<RecordId> = self
            .matching(map)
            .into_iter()
            .skip(first)
            .take(last.saturating_sub(first))
            .collect();

        if self.repeat_window {
            Ok(window.iter().flat_map(|id| [*id, *id]).collect())
        } else {
            Ok(window)
        }
    }

    async fn hydrate(
        &self,
        resource_type: &str,
        ids: &[RecordId],
    ) -> StoreResult<Vec<ClinicalRecord>> {
        self.record(StoreCall::Hydrate {
            resource_type: resource_type.to_string(),
            ids: ids.to_vec(),
        });
        self.check(FailPoint::Hydrate)?;

        // Highest id first, so callers must realign.
        let mut records: Vec<ClinicalRecord> = ids
            .iter()
            .filter(|id| {
                !self
                    .unhydratable
                    .contains(&(resource_type.to_string(), **id))
            })
            .map(|id| ClinicalRecord {
                resource_type: resource_type.to_string(),
                id: *id,
            })
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }

    async fn fetch_related(
        &self,
        query: &RelationshipQuery<'_>,
        anchors: &[RecordId],
    ) -> StoreResult<Vec<RecordId>> {
        self.record(StoreCall::FetchRelated {
            anchor_type: query.anchor_type.to_string(),
            related_type: query.related_type.to_string(),
            search_param: query.search_param.to_string(),
            direction: query.direction,
            anchors: anchors.to_vec(),
        });
        self.check(FailPoint::FetchRelated)?;

        let key = (
            query.anchor_type.to_string(),
            query.search_param.to_string(),
            query.direction,
        );
        let Some(edges) = self.edges.get(&key) else {
            return Err(StoreError::UnknownRelationship {
                related_type: query.related_type.to_string(),
                search_param: query.search_param.to_string(),
            });
        };

        Ok(anchors
            .iter()
            .flat_map(|anchor| edges.get(anchor).cloned().unwrap_or_default())
            .collect())
    }
}

/// Converts raw values to record identifiers.
pub fn record_ids(values: &[u64]) -> Vec<RecordId> {
    values.iter().copied().map(RecordId::new).collect()
}

/// Returns the raw values of record identifiers.
pub fn raw_ids(ids: &[RecordId]) -> Vec<u64> {
    ids.iter().map(RecordId::value).collect()
}

/// Builds an Observation search for one patient.
pub fn observation_map(includes: &[IncludeSpec], rev_includes: &[IncludeSpec]) -> ParameterMap {
    ParameterMap::builder("Observation")
        .add_parameter(
            HandlerKey::PATIENT_REFERENCE,
            "patient",
            ConstraintValue::reference("Patient", "123"),
        )
        .add_includes(includes.iter().cloned())
        .add_rev_includes(rev_includes.iter().cloned())
        .build()
        .expect("valid parameter map")
}

/// Installs a test subscriber once, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
