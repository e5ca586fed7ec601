//! End-to-end execution of one search request.

use std::sync::Arc;

use crate::config::SearchEngineConfig;
use crate::core::{CountCache, CountCacheInvalidator, InMemoryCountCache, StoreCapability};
use crate::error::{EngineResult, ValidationError};
use crate::types::{ExpandedResultSet, PageRequest, ParameterMap, ResultWindow, TotalCount};

use super::expander::GraphExpander;
use super::hydration::{hydrate_in_order, unique_in_order};

/// Drives a search through a [`StoreCapability`].
///
/// The orchestrator holds no per-request state and can be shared across
/// concurrent requests. The only shared mutable state is the optional
/// count cache.
///
/// # Example
///
/// ```ignore
/// let orchestrator = SearchOrchestrator::with_default_cache(SearchEngineConfig::default());
///
/// let map = ParameterMap::builder("Observation")
///     .add_parameter(HandlerKey::PATIENT_REFERENCE, "patient", ConstraintValue::reference("Patient", "123"))
///     .build()?;
///
/// let page = PageRequest::first_page(20)?.with_exact_total();
/// let result = orchestrator.execute(&map, &store, page).await?;
/// ```
pub struct SearchOrchestrator {
    config: SearchEngineConfig,
    count_cache: Option<Arc<dyn CountCache>>,
    expander: GraphExpander,
}

impl SearchOrchestrator {
    /// Creates an orchestrator without a count cache.
    ///
    /// Every exact count goes to the store.
    pub fn new(config: SearchEngineConfig) -> Self {
        Self {
            config,
            count_cache: None,
            expander: GraphExpander::new(),
        }
    }

    /// Creates an orchestrator with an [`InMemoryCountCache`] sized from the
    /// configuration, unless caching is disabled there.
    pub fn with_default_cache(config: SearchEngineConfig) -> Self {
        let mut orchestrator = Self::new(config);
        if orchestrator.config.count_cache.enabled {
            let cache: Arc<dyn CountCache> = Arc::new(InMemoryCountCache::from_config(
                &orchestrator.config.count_cache,
            ));
            orchestrator.count_cache = Some(cache);
        }
        orchestrator
    }

    /// Sets the count cache.
    pub fn with_count_cache(mut self, cache: Arc<dyn CountCache>) -> Self {
        self.count_cache = Some(cache);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SearchEngineConfig {
        &self.config
    }

    /// Returns an invalidation handle for the count cache, if there is one.
    pub fn invalidator(&self) -> Option<CountCacheInvalidator> {
        self.count_cache
            .as_ref()
            .map(|cache| CountCacheInvalidator::new(Arc::clone(cache)))
    }

    /// Executes one search.
    ///
    /// With `page.summary_count_only` only the count is resolved and no
    /// records are fetched. Otherwise the window is clamped to
    /// `max_page_size`, fetched, hydrated and expanded.
    ///
    /// An empty or inverted window and too many includes are rejected before
    /// any store call. Store failures propagate unchanged. Count cache
    /// failures are logged and the count is taken from the store.
    pub async fn execute<S>(
        &self,
        map: &ParameterMap,
        store: &S,
        page: PageRequest,
    ) -> EngineResult<ExpandedResultSet<S::Record>>
    where
        S: StoreCapability + ?Sized,
    {
        page.validate()?;

        let include_count = map.includes().len() + map.rev_includes().len();
        if include_count > self.config.max_includes {
            return Err(ValidationError::TooManyIncludes {
                count: include_count,
                max: self.config.max_includes,
            }
            .into());
        }

        if page.summary_count_only {
            let page = page.minimal();
            let total = self.resolve_count(map, store).await?;
            tracing::debug!(
                "Count-only search on {} via {}: {} matches",
                map.resource_type(),
                store.backend_name(),
                total
            );
            return Ok(ExpandedResultSet::new(ResultWindow::empty(
                map.resource_type(),
                &page,
                TotalCount::Exact(total),
            )));
        }

        let requested = page.size();
        let page = page.clamped(self.config.max_page_size);
        if page.size() < requested {
            tracing::debug!(
                "Clamped page size from {} to {}",
                requested,
                page.size()
            );
        }

        let exact_total = if page.exact_total {
            Some(self.resolve_count(map, store).await?)
        } else {
            None
        };

        let fetched = store.fetch_window(map, page.first, page.last).await?;
        let (mut identifiers, dropped) = unique_in_order(fetched);
        if dropped > 0 {
            tracing::warn!(
                "{} returned {} duplicate identifiers for {}; keeping first occurrences",
                store.backend_name(),
                dropped,
                map.resource_type()
            );
        }
        if identifiers.len() > page.size() {
            tracing::warn!(
                "{} returned {} identifiers for a window of {}; truncating",
                store.backend_name(),
                identifiers.len(),
                page.size()
            );
            identifiers.truncate(page.size());
        }

        let records = hydrate_in_order(store, map.resource_type(), &identifiers).await?;

        let total = match exact_total {
            Some(count) => TotalCount::Exact(count),
            None => derive_total(&page, identifiers.len()),
        };

        let primary = ResultWindow {
            resource_type: map.resource_type().to_string(),
            identifiers,
            records,
            first_result: page.first,
            last_result: page.last,
            total,
        };

        let related = self
            .expander
            .expand(&primary, map.includes(), map.rev_includes(), store)
            .await?;

        Ok(ExpandedResultSet { primary, related })
    }

    /// Returns the exact count, reading through the cache when one is active.
    async fn resolve_count<S>(&self, map: &ParameterMap, store: &S) -> EngineResult<u64>
    where
        S: StoreCapability + ?Sized,
    {
        let Some(cache) = self.active_cache() else {
            return Ok(store.count(map).await?);
        };

        let signature = match map.to_cache_signature() {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!("Count cache bypassed for {}: {}", map.resource_type(), e);
                return Ok(store.count(map).await?);
            }
        };
        match cache.get(&signature).await {
            Ok(Some(count)) => {
                tracing::debug!("Count cache hit for {}", map.resource_type());
                return Ok(count);
            }
            Ok(None) => {
                tracing::debug!("Count cache miss for {}", map.resource_type());
            }
            Err(e) => {
                tracing::warn!("Count cache read failed, recomputing: {}", e);
            }
        }

        let count = store.count(map).await?;

        if let Err(e) = cache
            .put(&signature, count, self.config.count_cache.ttl)
            .await
        {
            tracing::warn!("Count cache write failed: {}", e);
        }

        Ok(count)
    }

    fn active_cache(&self) -> Option<&dyn CountCache> {
        if !self.config.count_cache.enabled {
            return None;
        }
        self.count_cache.as_deref()
    }
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("config", &self.config)
            .field("count_cache", &self.count_cache.is_some())
            .finish()
    }
}

/// Returns the total implied by a window when no exact count was requested.
///
/// A short window ends the result set, so its end is the total. A short
/// window past the end of a non-empty result proves nothing about where
/// the result ended.
fn derive_total(page: &PageRequest, returned: usize) -> TotalCount {
    if returned < page.size() && (returned > 0 || page.first == 0) {
        TotalCount::Exact((page.first + returned) as u64)
    } else {
        TotalCount::Unknown
    }
}
