//! The combined result of one search: the primary window plus expansions.

use serde::{Deserialize, Serialize};

use super::pagination::ResultWindow;
use super::record::RecordId;

/// Why a record is part of the result (maps to `Bundle.entry.search.mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEntryMode {
    /// Matched the search criteria.
    Match,
    /// Added by an include or revinclude.
    Include,
}

/// Records of one related type, in order of discovery.
#[derive(Debug, Clone)]
pub struct RelatedBucket<R> {
    /// The resource type of every record in this bucket.
    pub resource_type: String,

    /// Identifiers in the order they were first discovered.
    pub identifiers: Vec<RecordId>,

    /// Hydrated records in discovery order.
    ///
    /// Shorter than `identifiers` when the store could not hydrate some of them.
    pub records: Vec<R>,
}

impl<R> RelatedBucket<R> {
    /// Creates an empty bucket.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            identifiers: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Returns the number of records in the bucket.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the bucket holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One record of an [`ExpandedResultSet`] as seen by bundle assembly.
#[derive(Debug)]
pub struct ResultEntry<'a, R> {
    /// Match or include.
    pub mode: SearchEntryMode,
    /// The record's resource type.
    pub resource_type: &'a str,
    /// The hydrated record.
    pub record: &'a R,
}

/// A primary result window together with its expanded related records.
///
/// No `(type, identifier)` pair appears more than once across the primary
/// window and all related buckets.
#[derive(Debug, Clone)]
pub struct ExpandedResultSet<R> {
    /// The matched records of the searched type.
    pub primary: ResultWindow<R>,

    /// Related records grouped by type, buckets in order of creation.
    ///
    /// Buckets filled by forward includes come before buckets first created
    /// by reverse includes.
    pub related: Vec<RelatedBucket<R>>,
}

impl<R> ExpandedResultSet<R> {
    /// Creates a result with no related records.
    pub fn new(primary: ResultWindow<R>) -> Self {
        Self {
            primary,
            related: Vec::new(),
        }
    }

    /// Returns the bucket for a related type.
    pub fn related(&self, resource_type: &str) -> Option<&RelatedBucket<R>> {
        self.related.iter().find(|b| b.resource_type == resource_type)
    }

    /// Returns the identifiers collected for a related type.
    pub fn related_ids(&self, resource_type: &str) -> &[RecordId] {
        self.related(resource_type)
            .map(|b| b.identifiers.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the related types in bucket order.
    pub fn related_types(&self) -> impl Iterator<Item = &str> {
        self.related.iter().map(|b| b.resource_type.as_str())
    }

    /// Returns the total number of related records.
    pub fn included_len(&self) -> usize {
        self.related.iter().map(RelatedBucket::len).sum()
    }

    /// Returns true if the record is part of the result in any role.
    pub fn contains(&self, resource_type: &str, id: RecordId) -> bool {
        (self.primary.resource_type == resource_type && self.primary.identifiers.contains(&id))
            || self
                .related(resource_type)
                .is_some_and(|b| b.identifiers.contains(&id))
    }

    /// Iterates all records: primary matches first, then related buckets in order.
    pub fn entries(&self) -> impl Iterator<Item = ResultEntry<'_, R>> {
        let primary = self.primary.records.iter().map(|record| ResultEntry {
            mode: SearchEntryMode::Match,
            resource_type: self.primary.resource_type.as_str(),
            record,
        });

        let related = self.related.iter().flat_map(|bucket| {
            bucket.records.iter().map(move |record| ResultEntry {
                mode: SearchEntryMode::Include,
                resource_type: bucket.resource_type.as_str(),
                record,
            })
        });

        primary.chain(related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PageRequest, TotalCount};

    fn sample() -> ExpandedResultSet<&'static str> {
        let page = PageRequest::first_page(10).unwrap();
        let mut primary = ResultWindow::empty("Observation", &page, TotalCount::Exact(2));
        primary.identifiers = vec![RecordId::new(1), RecordId::new(2)];
        primary.records = vec!["obs-1", "obs-2"];

        let mut patients = RelatedBucket::new("Patient");
        patients.identifiers.push(RecordId::new(10));
        patients.records.push("pat-10");

        let mut result = ExpandedResultSet::new(primary);
        result.related.push(patients);
        result
    }

    #[test]
    fn test_entries_order_and_modes() {
        let result = sample();
        let entries: Vec<_> = result
            .entries()
            .map(|e| (e.mode, e.resource_type, *e.record))
            .collect();

        assert_eq!(
            entries,
            vec![
                (SearchEntryMode::Match, "Observation", "obs-1"),
                (SearchEntryMode::Match, "Observation", "obs-2"),
                (SearchEntryMode::Include, "Patient", "pat-10"),
            ]
        );
    }

    #[test]
    fn test_lookup_helpers() {
        let result = sample();
        assert_eq!(result.related_ids("Patient"), &[RecordId::new(10)]);
        assert!(result.related_ids("Encounter").is_empty());
        assert_eq!(result.included_len(), 1);
        assert!(result.contains("Observation", RecordId::new(2)));
        assert!(result.contains("Patient", RecordId::new(10)));
        assert!(!result.contains("Patient", RecordId::new(1)));
        assert_eq!(result.related_types().collect::<Vec<_>>(), vec!["Patient"]);
    }
}
