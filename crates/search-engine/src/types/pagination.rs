//! Pagination types for search requests and results.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::record::RecordId;

/// The result window a caller asks for.
///
/// Bounds are zero-based and half-open: `first..last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Index of the first result in the window.
    pub first: usize,

    /// Index one past the last result in the window.
    pub last: usize,

    /// Whether the caller wants an exact total count.
    pub exact_total: bool,

    /// Whether the caller wants only the count (`_summary=count`).
    pub summary_count_only: bool,
}

impl PageRequest {
    /// Creates a page request for `first..last`.
    pub fn new(first: usize, last: usize) -> Result<Self, ValidationError> {
        if first >= last {
            return Err(ValidationError::InvalidPage { first, last });
        }
        Ok(Self {
            first,
            last,
            exact_total: false,
            summary_count_only: false,
        })
    }

    /// Checks that the window is non-empty.
    ///
    /// Requests built through [`new`](Self::new) always pass. Requests built
    /// from a struct literal or deserialized input are checked here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first >= self.last {
            return Err(ValidationError::InvalidPage {
                first: self.first,
                last: self.last,
            });
        }
        Ok(())
    }

    /// Creates a request for the first `size` results.
    pub fn first_page(size: usize) -> Result<Self, ValidationError> {
        Self::new(0, size)
    }

    /// Creates a request for page `number` (zero-based) of `size` results.
    pub fn page(number: usize, size: usize) -> Result<Self, ValidationError> {
        let first = number.saturating_mul(size);
        Self::new(first, first.saturating_add(size))
    }

    /// Requests an exact total count.
    pub fn with_exact_total(mut self) -> Self {
        self.exact_total = true;
        self
    }

    /// Requests only the total count.
    pub fn count_only(mut self) -> Self {
        self.summary_count_only = true;
        self
    }

    /// Returns the number of results the window can hold.
    pub fn size(&self) -> usize {
        self.last.saturating_sub(self.first)
    }

    /// Returns this request with the window shrunk to at most `max_size` results.
    pub fn clamped(mut self, max_size: usize) -> Self {
        if self.size() > max_size {
            self.last = self.first.saturating_add(max_size.max(1));
        }
        self
    }

    /// Returns this request with the smallest possible window.
    pub fn minimal(mut self) -> Self {
        self.last = self.first.saturating_add(1);
        self
    }
}

/// The total number of matches for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum TotalCount {
    /// A precisely computed count.
    Exact(u64),
    /// Not computed; the caller did not ask for an exact total.
    Unknown,
}

impl TotalCount {
    /// Returns the count if it is exact.
    pub fn exact(&self) -> Option<u64> {
        match self {
            TotalCount::Exact(n) => Some(*n),
            TotalCount::Unknown => None,
        }
    }

    /// Returns true if the count is exact.
    pub fn is_exact(&self) -> bool {
        matches!(self, TotalCount::Exact(_))
    }
}

/// One page of matched records for the searched type.
#[derive(Debug, Clone)]
pub struct ResultWindow<R> {
    /// The searched resource type.
    pub resource_type: String,

    /// Matching identifiers in result order, unique within the window.
    pub identifiers: Vec<RecordId>,

    /// Hydrated records in the same order as `identifiers`.
    ///
    /// May be shorter than `identifiers` if the store could not hydrate some
    /// of them.
    pub records: Vec<R>,

    /// Zero-based index of the first result.
    pub first_result: usize,

    /// Index one past the last requested result.
    pub last_result: usize,

    /// The total number of matches.
    pub total: TotalCount,
}

impl<R> ResultWindow<R> {
    /// Creates an empty window.
    pub fn empty(resource_type: impl Into<String>, page: &PageRequest, total: TotalCount) -> Self {
        Self {
            resource_type: resource_type.into(),
            identifiers: Vec::new(),
            records: Vec::new(),
            first_result: page.first,
            last_result: page.last,
            total,
        }
    }

    /// Returns the number of identifiers in the window.
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns true if the window holds no identifiers.
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Returns whether a following page exists.
    ///
    /// With an exact total this is exact. Without one, a full window is
    /// taken to mean more results may follow.
    pub fn has_next(&self) -> bool {
        match self.total {
            TotalCount::Exact(total) => ((self.first_result + self.len()) as u64) < total,
            TotalCount::Unknown => self.len() >= self.last_result.saturating_sub(self.first_result),
        }
    }

    /// Returns whether a previous page exists.
    pub fn has_previous(&self) -> bool {
        self.first_result > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        let page = PageRequest::new(10, 30).unwrap();
        assert_eq!(page.size(), 20);
        assert!(!page.exact_total);
        assert!(!page.summary_count_only);

        assert_eq!(
            PageRequest::new(5, 5).unwrap_err(),
            ValidationError::InvalidPage { first: 5, last: 5 }
        );
        assert!(PageRequest::new(6, 5).is_err());
    }

    #[test]
    fn test_validate_literal_window() {
        assert!(PageRequest::new(0, 1).unwrap().validate().is_ok());

        let inverted = PageRequest {
            first: 10,
            last: 2,
            exact_total: false,
            summary_count_only: false,
        };
        assert_eq!(
            inverted.validate(),
            Err(ValidationError::InvalidPage { first: 10, last: 2 })
        );

        let decoded: PageRequest = serde_json::from_str(
            r#"{"first":4,"last":4,"exact_total":true,"summary_count_only":false}"#,
        )
        .unwrap();
        assert!(decoded.validate().is_err());
    }

    #[test]
    fn test_page_numbering() {
        let page = PageRequest::page(2, 25).unwrap();
        assert_eq!(page.first, 50);
        assert_eq!(page.last, 75);
    }

    #[test]
    fn test_clamped() {
        let page = PageRequest::first_page(5000).unwrap().clamped(1000);
        assert_eq!(page.size(), 1000);

        let small = PageRequest::first_page(10).unwrap().clamped(1000);
        assert_eq!(small.size(), 10);
    }

    #[test]
    fn test_minimal_window() {
        let page = PageRequest::new(40, 60).unwrap().count_only().minimal();
        assert_eq!(page.first, 40);
        assert_eq!(page.last, 41);
        assert!(page.summary_count_only);
    }

    #[test]
    fn test_total_count() {
        assert_eq!(TotalCount::Exact(7).exact(), Some(7));
        assert!(TotalCount::Exact(0).is_exact());
        assert_eq!(TotalCount::Unknown.exact(), None);
    }

    #[test]
    fn test_has_next_with_exact_total() {
        let page = PageRequest::first_page(2).unwrap();
        let mut window: ResultWindow<()> =
            ResultWindow::empty("Patient", &page, TotalCount::Exact(3));
        window.identifiers = vec![RecordId::new(1), RecordId::new(2)];
        assert!(window.has_next());

        window.total = TotalCount::Exact(2);
        assert!(!window.has_next());

        window.total = TotalCount::Exact(u64::from(u32::MAX) + 3);
        assert!(window.has_next());
        assert!(!window.has_previous());
    }

    #[test]
    fn test_has_next_without_total() {
        let page = PageRequest::new(2, 4).unwrap();
        let mut window: ResultWindow<()> =
            ResultWindow::empty("Patient", &page, TotalCount::Unknown);
        window.identifiers = vec![RecordId::new(3)];
        assert!(!window.has_next());
        assert!(window.has_previous());

        window.identifiers.push(RecordId::new(4));
        assert!(window.has_next());
    }
}
