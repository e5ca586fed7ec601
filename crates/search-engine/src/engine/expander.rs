//! Include and revinclude expansion of a primary result window.

use std::collections::{HashMap, HashSet};

use crate::core::{RelationshipQuery, StoreCapability};
use crate::error::EngineResult;
use crate::types::{
    IncludeDirection, IncludeSet, IncludeSpec, RecordId, RelatedBucket, ResultWindow,
};

use super::hydration::hydrate_in_order;

/// The set of `(type, identifier)` pairs already present in a result.
///
/// One index spans a whole expansion so that no record is added twice,
/// whichever spec finds it.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    seen: HashMap<String, HashSet<RecordId>>,
}

impl DedupIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index holding every identifier of the primary window.
    pub fn seeded<R>(primary: &ResultWindow<R>) -> Self {
        let mut index = Self::new();
        for id in &primary.identifiers {
            index.insert(&primary.resource_type, *id);
        }
        index
    }

    /// Records a pair, returning true if it was not present before.
    pub fn insert(&mut self, resource_type: &str, id: RecordId) -> bool {
        match self.seen.get_mut(resource_type) {
            Some(ids) => ids.insert(id),
            None => {
                self.seen
                    .insert(resource_type.to_string(), HashSet::from([id]));
                true
            }
        }
    }

    /// Returns true if the pair is present.
    pub fn contains(&self, resource_type: &str, id: RecordId) -> bool {
        self.seen
            .get(resource_type)
            .is_some_and(|ids| ids.contains(&id))
    }

    /// Returns the number of pairs in the index.
    pub fn len(&self) -> usize {
        self.seen.values().map(HashSet::len).sum()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.seen.values().all(HashSet::is_empty)
    }
}

/// Expands a primary window along forward and reverse relationships.
///
/// Forward specs are processed before reverse specs, each set in request
/// order. Every spec walks one hop from the primary identifiers, plus one
/// more hop from the records it just added when the spec iterates. Related
/// records are grouped into one bucket per type, in order of discovery.
///
/// A relationship the store reports as unknown contributes nothing. Any
/// other store failure aborts the expansion.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphExpander;

impl GraphExpander {
    /// Creates an expander.
    pub fn new() -> Self {
        Self
    }

    /// Expands `primary` and returns the related buckets.
    pub async fn expand<S>(
        &self,
        primary: &ResultWindow<S::Record>,
        includes: &IncludeSet,
        rev_includes: &IncludeSet,
        store: &S,
    ) -> EngineResult<Vec<RelatedBucket<S::Record>>>
    where
        S: StoreCapability + ?Sized,
    {
        let mut buckets: Vec<RelatedBucket<S::Record>> = Vec::new();
        if primary.is_empty() || (includes.is_empty() && rev_includes.is_empty()) {
            return Ok(buckets);
        }

        let mut index = DedupIndex::seeded(primary);

        for set in [includes, rev_includes] {
            for spec in set {
                self.expand_spec(primary, spec, set.direction(), store, &mut index, &mut buckets)
                    .await?;
            }
        }

        tracing::debug!(
            "Expanded {} {} matches into {} related records across {} types",
            primary.len(),
            primary.resource_type,
            buckets.iter().map(RelatedBucket::len).sum::<usize>(),
            buckets.len()
        );

        Ok(buckets)
    }

    async fn expand_spec<S>(
        &self,
        primary: &ResultWindow<S::Record>,
        spec: &IncludeSpec,
        direction: IncludeDirection,
        store: &S,
        index: &mut DedupIndex,
        buckets: &mut Vec<RelatedBucket<S::Record>>,
    ) -> EngineResult<()>
    where
        S: StoreCapability + ?Sized,
    {
        let mut added = self
            .walk(
                store,
                &primary.resource_type,
                &primary.identifiers,
                spec,
                direction,
                index,
            )
            .await?;

        if spec.iterate && !added.is_empty() {
            let next_hop = self
                .walk(store, &spec.related_type, &added, spec, direction, index)
                .await?;
            tracing::debug!(
                "{} {}:{} iterate hop added {} records",
                direction,
                spec.related_type,
                spec.search_param,
                next_hop.len()
            );
            added.extend(next_hop);
        }

        if added.is_empty() {
            return Ok(());
        }

        let records = hydrate_in_order(store, &spec.related_type, &added).await?;
        let bucket = bucket_for(buckets, &spec.related_type);
        bucket.identifiers.extend(added);
        bucket.records.extend(records);
        Ok(())
    }

    /// Runs one relationship hop and returns the identifiers not seen before.
    async fn walk<S>(
        &self,
        store: &S,
        anchor_type: &str,
        anchors: &[RecordId],
        spec: &IncludeSpec,
        direction: IncludeDirection,
        index: &mut DedupIndex,
    ) -> EngineResult<Vec<RecordId>>
    where
        S: StoreCapability + ?Sized,
    {
        let query = RelationshipQuery {
            anchor_type,
            related_type: &spec.related_type,
            search_param: &spec.search_param,
            direction,
        };

        let found = match store.fetch_related(&query, anchors).await {
            Ok(ids) => ids,
            Err(e) if e.is_unknown_relationship() => {
                tracing::debug!(
                    "Skipping {} {}:{} from {}: {}",
                    direction,
                    spec.related_type,
                    spec.search_param,
                    anchor_type,
                    e
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(found
            .into_iter()
            .filter(|id| index.insert(&spec.related_type, *id))
            .collect())
    }
}

fn bucket_for<'a, R>(
    buckets: &'a mut Vec<RelatedBucket<R>>,
    resource_type: &str,
) -> &'a mut RelatedBucket<R> {
    let position = match buckets.iter().position(|b| b.resource_type == resource_type) {
        Some(position) => position,
        None => {
            buckets.push(RelatedBucket::new(resource_type));
            buckets.len() - 1
        }
    };
    &mut buckets[position]
}
