//! Error types for the search engine.
//!
//! Errors are grouped by where they originate: malformed input caught while
//! building a request, failures raised by the backing store, and failures of
//! the count cache. Only the first two ever reach the caller of
//! [`SearchOrchestrator::execute`](crate::engine::SearchOrchestrator::execute);
//! cache failures are logged and the count is recomputed.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// The primary error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Structurally invalid request input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failure raised by the backing store
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Returns true if this error came from the backing store.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, EngineError::Store(_))
    }

    /// Returns true if this error was caused by malformed input.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }
}

/// Errors raised while constructing or validating request input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A parameter entry was added without a handler key.
    #[error("parameter '{param_name}' has an empty handler key")]
    EmptyHandlerKey { param_name: String },

    /// A parameter entry was added without a name.
    #[error("parameter under handler '{handler_key}' has an empty name")]
    EmptyParameterName { handler_key: String },

    /// The searched resource type is missing.
    #[error("parameter map has no resource type")]
    MissingResourceType,

    /// An include or revinclude value could not be parsed.
    #[error("malformed include '{value}': {message}")]
    MalformedInclude { value: String, message: String },

    /// A forward include did not name the type it resolves to.
    #[error("include '{value}' does not name a target resource type")]
    MissingIncludeTarget { value: String },

    /// The requested result window is empty or inverted.
    #[error("invalid page window: first={first}, last={last}")]
    InvalidPage { first: usize, last: usize },

    /// More include specifications than the engine is configured to expand.
    #[error("too many include specifications: {count}, maximum is {max}")]
    TooManyIncludes { count: usize, max: usize },
}

/// Errors raised by a [`StoreCapability`](crate::core::StoreCapability) implementation.
///
/// The engine propagates these unchanged; retry policy belongs to the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is currently unavailable.
    #[error("store unavailable: {backend_name}: {message}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// A query failed to execute.
    #[error("store query failed: {message}")]
    QueryFailed { message: String },

    /// The store's own call-level timeout elapsed.
    #[error("store call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The store does not know the requested relationship.
    ///
    /// The expander treats this as "no matches" rather than a failure.
    #[error("unknown relationship {related_type}:{search_param}")]
    UnknownRelationship {
        related_type: String,
        search_param: String,
    },

    /// Internal store error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Returns true if the store did not recognise a relationship.
    pub fn is_unknown_relationship(&self) -> bool {
        matches!(self, StoreError::UnknownRelationship { .. })
    }
}

/// Errors raised by a [`CountCache`](crate::core::CountCache) backend.
///
/// Never fatal: the orchestrator falls back to counting through the store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache backend cannot be reached.
    #[error("count cache unavailable: {message}")]
    Unavailable { message: String },

    /// The cache backend returned an error.
    #[error("count cache backend error: {message}")]
    Backend { message: String },

    /// A cache key could not be computed for a parameter map.
    #[error("count cache signature failed: {message}")]
    Signature { message: String },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for count cache calls.
pub type CacheResult<T> = Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Signature {
            message: err.to_string(),
        }
    }
}
