//! Include and revinclude specifications.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Which way an include walks a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeDirection {
    /// `_include`: resources referenced by the anchors.
    Forward,
    /// `_revinclude`: resources referencing the anchors.
    Reverse,
}

impl fmt::Display for IncludeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludeDirection::Forward => write!(f, "_include"),
            IncludeDirection::Reverse => write!(f, "_revinclude"),
        }
    }
}

/// A request to expand the result set along one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludeSpec {
    /// The resource type fetched by this expansion.
    pub related_type: String,

    /// The relationship field that links the two types.
    pub search_param: String,

    /// Whether one extra hop over newly added resources is allowed.
    pub iterate: bool,
}

/// Identity of an include within one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IncludeKey {
    /// Forward or reverse.
    pub direction: IncludeDirection,
    /// The related resource type.
    pub related_type: String,
    /// The relationship field.
    pub search_param: String,
}

impl IncludeSpec {
    /// Creates a non-iterating include specification.
    pub fn new(related_type: impl Into<String>, search_param: impl Into<String>) -> Self {
        Self {
            related_type: related_type.into(),
            search_param: search_param.into(),
            iterate: false,
        }
    }

    /// Marks the specification as iterating.
    pub fn iterating(mut self) -> Self {
        self.iterate = true;
        self
    }

    /// Returns the identity of this spec for the given direction.
    pub fn key(&self, direction: IncludeDirection) -> IncludeKey {
        IncludeKey {
            direction,
            related_type: self.related_type.clone(),
            search_param: self.search_param.clone(),
        }
    }

    /// Parses an `_include` value of the form `Source:param:Target`.
    ///
    /// The target type is required because it is the type that gets fetched.
    pub fn parse_include(value: &str, iterate: bool) -> Result<Self, ValidationError> {
        let parts = split_include(value)?;
        match parts.as_slice() {
            [_, param, target] => Ok(Self {
                related_type: (*target).to_string(),
                search_param: (*param).to_string(),
                iterate,
            }),
            [_, _] => Err(ValidationError::MissingIncludeTarget {
                value: value.to_string(),
            }),
            _ => Err(malformed(value, "expected Source:param:Target")),
        }
    }

    /// Parses a `_revinclude` value of the form `Source:param[:Target]`.
    ///
    /// The source type is what gets fetched. A trailing target type only
    /// restates the searched type and is ignored.
    pub fn parse_revinclude(value: &str, iterate: bool) -> Result<Self, ValidationError> {
        let parts = split_include(value)?;
        match parts.as_slice() {
            [source, param] | [source, param, _] => Ok(Self {
                related_type: (*source).to_string(),
                search_param: (*param).to_string(),
                iterate,
            }),
            _ => Err(malformed(value, "expected Source:param[:Target]")),
        }
    }

    /// Parses a query parameter such as `_include:iterate=Location:partof:Location`.
    ///
    /// Returns `None` when the name is not an include parameter.
    pub fn parse_parameter(
        name: &str,
        value: &str,
    ) -> Option<Result<(IncludeDirection, Self), ValidationError>> {
        let (base, modifier) = match name.split_once(':') {
            Some((base, modifier)) => (base, Some(modifier)),
            None => (name, None),
        };

        let direction = match base {
            "_include" => IncludeDirection::Forward,
            "_revinclude" => IncludeDirection::Reverse,
            _ => return None,
        };

        let iterate = match modifier {
            None => false,
            // `recurse` is the R3 spelling of `iterate`
            Some("iterate") | Some("recurse") => true,
            Some(other) => {
                return Some(Err(malformed(
                    value,
                    &format!("unsupported modifier '{}'", other),
                )));
            }
        };

        let parsed = match direction {
            IncludeDirection::Forward => Self::parse_include(value, iterate),
            IncludeDirection::Reverse => Self::parse_revinclude(value, iterate),
        };
        Some(parsed.map(|spec| (direction, spec)))
    }

    fn sort_key(&self) -> (&str, &str, bool) {
        (self.related_type.as_str(), self.search_param.as_str(), self.iterate)
    }
}

fn split_include(value: &str) -> Result<Vec<&str>, ValidationError> {
    let trimmed = value.trim();
    if trimmed == "*" {
        return Err(malformed(value, "wildcard includes are not supported"));
    }
    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(malformed(value, "empty segment"));
    }
    Ok(parts)
}

fn malformed(value: &str, message: &str) -> ValidationError {
    ValidationError::MalformedInclude {
        value: value.to_string(),
        message: message.to_string(),
    }
}

/// A set of include specifications for one direction.
///
/// Keeps insertion order for expansion. Specs sharing a related type and
/// relationship field are merged; if either asked to iterate, the merged
/// spec iterates.
#[derive(Debug, Clone)]
pub struct IncludeSet {
    direction: IncludeDirection,
    specs: Vec<IncludeSpec>,
    positions: HashMap<IncludeKey, usize>,
}

impl IncludeSet {
    /// Creates an empty set.
    pub fn new(direction: IncludeDirection) -> Self {
        Self {
            direction,
            specs: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Returns the direction of every spec in this set.
    pub fn direction(&self) -> IncludeDirection {
        self.direction
    }

    /// Inserts a spec. Returns false if it merged into an existing one.
    pub fn insert(&mut self, spec: IncludeSpec) -> bool {
        let key = spec.key(self.direction);
        if let Some(&position) = self.positions.get(&key) {
            self.specs[position].iterate |= spec.iterate;
            return false;
        }
        self.positions.insert(key, self.specs.len());
        self.specs.push(spec);
        true
    }

    /// Returns true if a spec with this identity was requested.
    ///
    /// A key for the other direction never matches.
    pub fn contains(&self, key: &IncludeKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Iterates specs in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, IncludeSpec> {
        self.specs.iter()
    }

    /// Returns the number of distinct specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if no spec was requested.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Returns the specs in canonical (sorted) order.
    pub fn sorted(&self) -> Vec<&IncludeSpec> {
        let mut sorted: Vec<&IncludeSpec> = self.specs.iter().collect();
        sorted.sort_by(|a, b| cmp_specs(a, b));
        sorted
    }
}

fn cmp_specs(a: &IncludeSpec, b: &IncludeSpec) -> Ordering {
    a.sort_key().cmp(&b.sort_key())
}

impl PartialEq for IncludeSet {
    fn eq(&self, other: &Self) -> bool {
        self.direction == other.direction && self.sorted() == other.sorted()
    }
}

impl Eq for IncludeSet {}

impl<'a> IntoIterator for &'a IncludeSet {
    type Item = &'a IncludeSpec;
    type IntoIter = std::slice::Iter<'a, IncludeSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}
