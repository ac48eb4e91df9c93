// crates/dataset-catalog-core/src/runtime/query.rs
// ============================================================================
// Module: Dataset Catalog Query Facade
// Description: Read-only operations served by the index or the record store.
// Purpose: Give every API surface one read path with a single fallback policy.
// Dependencies: crate::{core, interfaces, runtime::engine}
// ============================================================================

//! ## Overview
//! The query facade answers `list`, `latest`, `search`, `get_by_id`, and
//! `stats`. Each read goes to the search index while it is fresh. When the
//! index is stale or fails, the same answer is computed by scanning the record
//! store with the shared ranking in [`crate::core::search`], so the two paths
//! are indistinguishable to callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::CatalogStats;
use crate::core::DatasetId;
use crate::core::DatasetRecord;
use crate::core::SearchQuery;
use crate::core::search;
use crate::interfaces::Clock;
use crate::interfaces::RecordStore;
use crate::interfaces::SearchIndex;
use crate::runtime::engine::EngineError;
use crate::runtime::engine::SyncEngine;

// ============================================================================
// SECTION: Query Facade
// ============================================================================

/// Read-only view over a [`SyncEngine`].
pub struct QueryFacade<'a, S, I, C> {
    /// Engine owning both stores.
    engine: &'a SyncEngine<S, I, C>,
}

impl<'a, S, I, C> QueryFacade<'a, S, I, C>
where
    S: RecordStore,
    I: SearchIndex,
    C: Clock,
{
    /// Wraps an engine.
    pub(crate) const fn new(engine: &'a SyncEngine<S, I, C>) -> Self {
        Self { engine }
    }

    /// Returns every record in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns a record store error when the fallback scan fails.
    pub fn list_all(&self) -> Result<Vec<DatasetRecord>, EngineError> {
        self.engine.read(|index| index.list_all(), |mut records| {
            records.sort_by_key(|record| record.id);
            records
        })
    }

    /// Returns the `count` most recently updated records.
    ///
    /// `None` uses the configured default count.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when `count` is zero or above the
    /// configured maximum.
    pub fn latest(&self, count: Option<usize>) -> Result<Vec<DatasetRecord>, EngineError> {
        let count = self.resolve_limit(count, self.engine.config().default_latest_count, "count")?;
        self.engine.read(|index| index.latest(count), |records| search::latest(&records, count))
    }

    /// Returns records matching `text`, ranked by relevance then recency.
    ///
    /// `None` uses the configured default limit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an invalid limit or query.
    pub fn search(&self, text: &str, limit: Option<usize>) -> Result<Vec<DatasetRecord>, EngineError> {
        let limit = self.resolve_limit(limit, self.engine.config().default_search_limit, "limit")?;
        let query = SearchQuery::new(text, limit)?;
        self.engine.read(|index| index.search(&query), |records| search::rank(&records, &query))
    }

    /// Returns the record with identifier `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when no record has that id.
    pub fn get_by_id(&self, id: DatasetId) -> Result<DatasetRecord, EngineError> {
        self.engine
            .read(
                |index| index.get_by_id(id),
                |records| records.into_iter().find(|record| record.id == id),
            )?
            .ok_or(EngineError::NotFound(id))
    }

    /// Returns collection statistics.
    ///
    /// # Errors
    ///
    /// Returns a record store error when the fallback scan fails.
    pub fn stats(&self) -> Result<CatalogStats, EngineError> {
        let records = self.list_all()?;
        Ok(CatalogStats::from_records(&records))
    }

    /// Applies the default and bounds to a caller-supplied limit.
    fn resolve_limit(
        &self,
        requested: Option<usize>,
        default: usize,
        field: &str,
    ) -> Result<usize, EngineError> {
        let max = self.engine.config().max_limit;
        match requested.unwrap_or(default) {
            0 => Err(EngineError::Validation(format!("{field} must be greater than zero"))),
            value if value > max => {
                Err(EngineError::Validation(format!("{field} must not exceed {max}")))
            }
            value => Ok(value),
        }
    }
}
