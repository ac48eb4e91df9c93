// crates/dataset-catalog-core/src/runtime/memory_index.rs
// ============================================================================
// Module: Dataset Catalog In-Memory Index
// Description: Simple in-memory search index for tests and the memory backend.
// Purpose: Provide a deterministic index implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a `BTreeMap`-backed [`SearchIndex`]. It holds nothing
//! across restarts; the sync engine rebuilds it from the record store on open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use crate::core::DatasetId;
use crate::core::DatasetRecord;
use crate::core::SearchQuery;
use crate::core::search;
use crate::interfaces::IndexError;
use crate::interfaces::SearchIndex;

// ============================================================================
// SECTION: In-Memory Index
// ============================================================================

/// In-memory search index.
#[derive(Debug, Default, Clone)]
pub struct InMemorySearchIndex {
    /// Records keyed by identifier.
    records: Arc<RwLock<BTreeMap<DatasetId, DatasetRecord>>>,
}

impl InMemorySearchIndex {
    /// Creates an empty in-memory index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Error reported when the index lock is poisoned.
fn poisoned() -> IndexError {
    IndexError::Unavailable("in-memory index lock poisoned".to_string())
}

impl SearchIndex for InMemorySearchIndex {
    fn upsert(&self, record: &DatasetRecord) -> Result<(), IndexError> {
        self.records.write().map_err(|_| poisoned())?.insert(record.id, record.clone());
        Ok(())
    }

    fn get_by_id(&self, id: DatasetId) -> Result<Option<DatasetRecord>, IndexError> {
        Ok(self.records.read().map_err(|_| poisoned())?.get(&id).cloned())
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<DatasetRecord>, IndexError> {
        let guard = self.records.read().map_err(|_| poisoned())?;
        Ok(search::rank(guard.values(), query))
    }

    fn latest(&self, count: usize) -> Result<Vec<DatasetRecord>, IndexError> {
        let guard = self.records.read().map_err(|_| poisoned())?;
        Ok(search::latest(guard.values(), count))
    }

    fn list_all(&self) -> Result<Vec<DatasetRecord>, IndexError> {
        Ok(self.records.read().map_err(|_| poisoned())?.values().cloned().collect())
    }

    fn rebuild_from(&self, records: &[DatasetRecord]) -> Result<(), IndexError> {
        let rebuilt: BTreeMap<DatasetId, DatasetRecord> =
            records.iter().map(|record| (record.id, record.clone())).collect();
        *self.records.write().map_err(|_| poisoned())? = rebuilt;
        Ok(())
    }
}
