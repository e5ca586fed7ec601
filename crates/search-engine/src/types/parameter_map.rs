//! The search constraint container.
//!
//! A [`ParameterMap`] is the uniform in-memory form of one search request: an
//! ordered list of typed constraints keyed by handler, an optional sort, and
//! the forward and reverse include specifications. It is built once through
//! [`ParameterMapBuilder`] and is immutable afterwards, so its cache signature
//! cannot drift while the engine holds it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CacheResult, ValidationError};

use super::include::{IncludeDirection, IncludeSet, IncludeSpec};

/// Identifies which category of search constraint an entry belongs to.
///
/// Handler keys are opaque to the engine. The store implementation uses them
/// to pick the criteria builder for each entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerKey(String);

impl HandlerKey {
    /// Constraints on the patient a record belongs to.
    pub const PATIENT_REFERENCE: &'static str = "patient.reference";
    /// Date and date-range constraints.
    pub const DATE_RANGE: &'static str = "date.range";
    /// Coded value constraints.
    pub const CODED: &'static str = "coded";
    /// Constraints on the public resource id.
    pub const RESOURCE_ID: &'static str = "resource.id";
    /// Constraints on the last-updated timestamp.
    pub const LAST_UPDATED: &'static str = "last.updated";

    /// Creates a handler key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HandlerKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for HandlerKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Comparison prefixes for ordered values.
///
/// See: https://build.fhir.org/search.html#prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchPrefix {
    /// Equal (default).
    #[default]
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
    /// Starts after.
    Sa,
    /// Ends before.
    Eb,
    /// Approximately equal.
    Ap,
}

impl fmt::Display for SearchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchPrefix::Eq => "eq",
            SearchPrefix::Ne => "ne",
            SearchPrefix::Gt => "gt",
            SearchPrefix::Lt => "lt",
            SearchPrefix::Ge => "ge",
            SearchPrefix::Le => "le",
            SearchPrefix::Sa => "sa",
            SearchPrefix::Eb => "eb",
            SearchPrefix::Ap => "ap",
        };
        f.write_str(s)
    }
}

impl FromStr for SearchPrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(SearchPrefix::Eq),
            "ne" => Ok(SearchPrefix::Ne),
            "gt" => Ok(SearchPrefix::Gt),
            "lt" => Ok(SearchPrefix::Lt),
            "ge" => Ok(SearchPrefix::Ge),
            "le" => Ok(SearchPrefix::Le),
            "sa" => Ok(SearchPrefix::Sa),
            "eb" => Ok(SearchPrefix::Eb),
            "ap" => Ok(SearchPrefix::Ap),
            _ => Err(format!("unknown search prefix: {}", s)),
        }
    }
}

impl SearchPrefix {
    /// Extracts a prefix from the beginning of a value string.
    ///
    /// Returns the prefix and the remaining value.
    pub fn extract(value: &str) -> (Self, &str) {
        if let (Some(prefix), Some(rest)) = (value.get(..2), value.get(2..)) {
            if let Ok(p) = prefix.parse() {
                return (p, rest);
            }
        }
        (SearchPrefix::Eq, value)
    }
}

/// A typed constraint value.
///
/// Values carry their own comparison prefix where one applies. The engine
/// does not interpret them; they only need to be comparable and hashable so
/// that equivalent maps produce equal cache signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConstraintValue {
    /// Plain string match.
    String { value: String },

    /// A code, optionally qualified by its system.
    Token {
        system: Option<String>,
        code: String,
    },

    /// A reference to another resource.
    Reference {
        resource_type: Option<String>,
        id: String,
    },

    /// A closed or half-open date range.
    DateRange {
        lower: Option<DateTime<Utc>>,
        upper: Option<DateTime<Utc>>,
    },

    /// A single date compared with a prefix.
    Date {
        prefix: SearchPrefix,
        value: DateTime<Utc>,
    },

    /// A number compared with a prefix.
    Number { prefix: SearchPrefix, value: Decimal },

    /// A quantity compared with a prefix.
    Quantity {
        prefix: SearchPrefix,
        value: Decimal,
        system: Option<String>,
        code: Option<String>,
    },

    /// A URI match.
    Uri { value: String },

    /// A boolean match.
    Boolean { value: bool },

    /// Matches on presence (`false`) or absence (`true`) of a value.
    Missing { missing: bool },
}

impl ConstraintValue {
    /// Creates a string constraint.
    pub fn string(value: impl Into<String>) -> Self {
        ConstraintValue::String {
            value: value.into(),
        }
    }

    /// Creates a token constraint with a system.
    pub fn token(system: impl Into<String>, code: impl Into<String>) -> Self {
        ConstraintValue::Token {
            system: Some(system.into()),
            code: code.into(),
        }
    }

    /// Creates a token constraint matching the code in any system.
    pub fn code(code: impl Into<String>) -> Self {
        ConstraintValue::Token {
            system: None,
            code: code.into(),
        }
    }

    /// Creates a typed reference constraint.
    pub fn reference(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        ConstraintValue::Reference {
            resource_type: Some(resource_type.into()),
            id: id.into(),
        }
    }

    /// Creates a date range constraint.
    pub fn date_range(lower: Option<DateTime<Utc>>, upper: Option<DateTime<Utc>>) -> Self {
        ConstraintValue::DateRange { lower, upper }
    }

    /// Creates a number constraint.
    pub fn number(prefix: SearchPrefix, value: Decimal) -> Self {
        ConstraintValue::Number { prefix, value }
    }
}

/// One constraint in a [`ParameterMap`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterEntry {
    /// The handler category this constraint belongs to.
    pub handler_key: HandlerKey,
    /// The search parameter name as the client supplied it.
    pub param_name: String,
    /// The constraint value.
    pub value: ConstraintValue,
}

/// Sort direction for _sort parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

/// A sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortDirective {
    /// The field to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Creates a sort directive.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parses a sort parameter value (e.g., "-date" for descending).
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('-') {
            Some(stripped) => Self::new(stripped, SortDirection::Descending),
            None => Self::new(s, SortDirection::Ascending),
        }
    }

    /// Parses a comma-separated `_sort` value into directives.
    pub fn parse_list(s: &str) -> Vec<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Self::parse)
            .collect()
    }
}

/// An immutable set of search constraints for one resource type.
///
/// Two maps are equal iff they search the same type with the same entry
/// sequence, the same sort and the same include sets. Entry order matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMap {
    resource_type: String,
    entries: Vec<ParameterEntry>,
    sort: Vec<SortDirective>,
    includes: IncludeSet,
    rev_includes: IncludeSet,
}

#[derive(Serialize)]
struct SignatureView<'a> {
    #[serde(rename = "t")]
    resource_type: &'a str,
    #[serde(rename = "e")]
    entries: &'a [ParameterEntry],
    #[serde(rename = "s")]
    sort: &'a [SortDirective],
    #[serde(rename = "i")]
    includes: Vec<&'a IncludeSpec>,
    #[serde(rename = "r")]
    rev_includes: Vec<&'a IncludeSpec>,
}

impl ParameterMap {
    /// Starts building a map for the given resource type.
    pub fn builder(resource_type: impl Into<String>) -> ParameterMapBuilder {
        ParameterMapBuilder::new(resource_type)
    }

    /// Returns the searched resource type.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the constraint entries in insertion order.
    pub fn entries(&self) -> &[ParameterEntry] {
        &self.entries
    }

    /// Returns the entries registered under a handler key, in insertion order.
    pub fn entries_for<'a>(
        &'a self,
        handler_key: &'a str,
    ) -> impl Iterator<Item = &'a ParameterEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.handler_key.as_str() == handler_key)
    }

    /// Returns the sort directives.
    pub fn sort(&self) -> &[SortDirective] {
        &self.sort
    }

    /// Returns the forward include specifications.
    pub fn includes(&self) -> &IncludeSet {
        &self.includes
    }

    /// Returns the reverse include specifications.
    pub fn rev_includes(&self) -> &IncludeSet {
        &self.rev_includes
    }

    /// Returns true if the map has no constraints (matches everything).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any include or revinclude was requested.
    pub fn has_includes(&self) -> bool {
        !self.includes.is_empty() || !self.rev_includes.is_empty()
    }

    /// Returns the canonical, order-preserving encoding used as the count cache key.
    ///
    /// Entry and sort order are kept as inserted. Include sets are encoded in
    /// key order since their insertion order carries no meaning for equality.
    ///
    /// Fails only if a constraint value cannot be encoded, in which case the
    /// map must not share a cache entry with any other.
    pub fn to_cache_signature(&self) -> CacheResult<String> {
        let view = SignatureView {
            resource_type: &self.resource_type,
            entries: &self.entries,
            sort: &self.sort,
            includes: self.includes.sorted(),
            rev_includes: self.rev_includes.sorted(),
        };
        Ok(serde_json::to_string(&view)?)
    }
}

/// Builder for [`ParameterMap`].
///
/// Structural problems (empty handler keys or names) are collected while
/// building and reported by [`build`](Self::build), so they never reach the
/// orchestrator.
#[derive(Debug, Clone)]
pub struct ParameterMapBuilder {
    resource_type: String,
    entries: Vec<ParameterEntry>,
    sort: Vec<SortDirective>,
    includes: IncludeSet,
    rev_includes: IncludeSet,
    error: Option<ValidationError>,
}

impl ParameterMapBuilder {
    /// Creates a builder for the given resource type.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            entries: Vec::new(),
            sort: Vec::new(),
            includes: IncludeSet::new(IncludeDirection::Forward),
            rev_includes: IncludeSet::new(IncludeDirection::Reverse),
            error: None,
        }
    }

    /// Appends a constraint.
    pub fn add_parameter(
        mut self,
        handler_key: impl Into<HandlerKey>,
        param_name: impl Into<String>,
        value: ConstraintValue,
    ) -> Self {
        let handler_key = handler_key.into();
        let param_name = param_name.into();

        if self.error.is_none() {
            if handler_key.as_str().trim().is_empty() {
                self.error = Some(ValidationError::EmptyHandlerKey {
                    param_name: param_name.clone(),
                });
            } else if param_name.trim().is_empty() {
                self.error = Some(ValidationError::EmptyParameterName {
                    handler_key: handler_key.to_string(),
                });
            }
        }

        self.entries.push(ParameterEntry {
            handler_key,
            param_name,
            value,
        });
        self
    }

    /// Appends a sort directive.
    pub fn add_sort(mut self, sort: SortDirective) -> Self {
        self.sort.push(sort);
        self
    }

    /// Adds a forward include specification.
    pub fn add_include(mut self, spec: IncludeSpec) -> Self {
        self.includes.insert(spec);
        self
    }

    /// Adds forward include specifications.
    pub fn add_includes(mut self, specs: impl IntoIterator<Item = IncludeSpec>) -> Self {
        for spec in specs {
            self.includes.insert(spec);
        }
        self
    }

    /// Adds a reverse include specification.
    pub fn add_rev_include(mut self, spec: IncludeSpec) -> Self {
        self.rev_includes.insert(spec);
        self
    }

    /// Adds reverse include specifications.
    pub fn add_rev_includes(mut self, specs: impl IntoIterator<Item = IncludeSpec>) -> Self {
        for spec in specs {
            self.rev_includes.insert(spec);
        }
        self
    }

    /// Freezes the builder into an immutable map.
    pub fn build(self) -> Result<ParameterMap, ValidationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.resource_type.trim().is_empty() {
            return Err(ValidationError::MissingResourceType);
        }

        Ok(ParameterMap {
            resource_type: self.resource_type,
            entries: self.entries,
            sort: self.sort,
            includes: self.includes,
            rev_includes: self.rev_includes,
        })
    }
}
