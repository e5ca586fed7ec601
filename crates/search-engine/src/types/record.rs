//! Record identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque, store-assigned record identifier.
///
/// This is the store's internal key (typically a primary key), not the public
/// resource id. Identifiers are only unique within one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Creates a record identifier.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hydrated domain record.
///
/// The engine never looks inside a record; it only needs the identifier to
/// keep hydrated records aligned with the identifier order it requested.
pub trait StoredRecord: Clone + Send + Sync {
    /// The store-assigned identifier of this record.
    fn record_id(&self) -> RecordId;
}
