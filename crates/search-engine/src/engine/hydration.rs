//! Hydration helpers shared by the orchestrator and the expander.

use std::collections::{HashMap, HashSet};

use crate::core::StoreCapability;
use crate::error::StoreResult;
use crate::types::{RecordId, StoredRecord};

/// Hydrates `ids` and returns the records in the same order as `ids`.
///
/// Records the store could not find are left out; records it returned
/// without being asked for are dropped.
pub(crate) async fn hydrate_in_order<S>(
    store: &S,
    resource_type: &str,
    ids: &[RecordId],
) -> StoreResult<Vec<S::Record>>
where
    S: StoreCapability + ?Sized,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let fetched = store.hydrate(resource_type, ids).await?;
    let mut by_id: HashMap<RecordId, S::Record> = fetched
        .into_iter()
        .map(|record| (record.record_id(), record))
        .collect();

    let ordered: Vec<S::Record> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

    if ordered.len() < ids.len() {
        tracing::debug!(
            "Hydrated {} of {} {} records; the rest no longer resolve",
            ordered.len(),
            ids.len(),
            resource_type
        );
    }

    Ok(ordered)
}

/// Removes repeated identifiers, keeping the first occurrence.
///
/// Returns the unique identifiers and how many were dropped.
pub(crate) fn unique_in_order(ids: Vec<RecordId>) -> (Vec<RecordId>, usize) {
    let total = ids.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<RecordId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
    let dropped = total - unique.len();
    (unique, dropped)
}
