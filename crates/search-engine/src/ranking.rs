//! Tie-inclusive "last N" ranking for time-series queries.
//!
//! Entries are ranked by distinct timestamp, newest first. Asking for the
//! top `n` returns every entry whose timestamp is among the `n` newest
//! distinct timestamps, so the result can hold more than `n` entries when
//! timestamps tie. A tie is never split.
//!
//! # Example
//!
//! ```
//! use std::num::NonZeroUsize;
//! use helios_search_engine::ranking::{LastnEntry, top_n};
//!
//! let entries = vec![
//!     LastnEntry::new("a", 3),
//!     LastnEntry::new("b", 2),
//!     LastnEntry::new("c", 2),
//!     LastnEntry::new("d", 1),
//! ];
//!
//! let top = top_n(&entries, NonZeroUsize::new(2).unwrap());
//! assert_eq!(top, vec!["a", "b", "c"]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};

/// One rankable entry.
///
/// `attributes` is carried along untouched for result assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastnEntry<I, T = DateTime<Utc>, A = ()> {
    /// The entry identifier.
    pub id: I,
    /// The timestamp the entry is ranked by.
    pub timestamp: T,
    /// Opaque auxiliary data.
    pub attributes: A,
}

impl<I, T> LastnEntry<I, T> {
    /// Creates an entry without attributes.
    pub fn new(id: I, timestamp: T) -> Self {
        Self {
            id,
            timestamp,
            attributes: (),
        }
    }
}

impl<I, T, A> LastnEntry<I, T, A> {
    /// Creates an entry carrying attributes.
    pub fn with_attributes(id: I, timestamp: T, attributes: A) -> Self {
        Self {
            id,
            timestamp,
            attributes,
        }
    }
}

/// Returns the entries in the top `n` timestamp ranks, newest first.
///
/// Entries sharing a timestamp keep their input order. If there are fewer
/// than `n` distinct timestamps, every entry is returned.
pub fn top_n_entries<I, T, A>(
    entries: &[LastnEntry<I, T, A>],
    n: NonZeroUsize,
) -> Vec<&LastnEntry<I, T, A>>
where
    T: Ord,
{
    rank(entries.iter().collect(), n)
}

/// Returns the identifiers in the top `n` timestamp ranks, newest first.
pub fn top_n<I, T, A>(entries: &[LastnEntry<I, T, A>], n: NonZeroUsize) -> Vec<I>
where
    I: Clone,
    T: Ord,
{
    top_n_entries(entries, n)
        .into_iter()
        .map(|entry| entry.id.clone())
        .collect()
}

/// Applies [`top_n`] to each group independently.
///
/// Groups are formed by `key` and emitted in order of first appearance,
/// e.g. one group per patient and code for a "last N observations" query.
pub fn top_n_by_group<I, T, A, K, F>(
    entries: &[LastnEntry<I, T, A>],
    n: NonZeroUsize,
    key: F,
) -> Vec<I>
where
    I: Clone,
    T: Ord,
    K: Eq + Hash,
    F: Fn(&LastnEntry<I, T, A>) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<&LastnEntry<I, T, A>>> = Vec::new();

    for entry in entries {
        let position = *positions.entry(key(entry)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[position].push(entry);
    }

    groups
        .into_iter()
        .flat_map(|group| rank(group, n))
        .map(|entry| entry.id.clone())
        .collect()
}

fn rank<I, T, A>(
    mut sorted: Vec<&LastnEntry<I, T, A>>,
    n: NonZeroUsize,
) -> Vec<&LastnEntry<I, T, A>>
where
    T: Ord,
{
    // Stable, so ties preserve input order.
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut ranks = 0;
    let mut current: Option<&T> = None;
    let mut result = Vec::with_capacity(sorted.len());

    for entry in sorted {
        if current != Some(&entry.timestamp) {
            if ranks == n.get() {
                break;
            }
            ranks += 1;
            current = Some(&entry.timestamp);
        }
        result.push(entry);
    }

    result
}
