// crates/dataset-catalog-cli/src/bootstrap.rs
// ============================================================================
// Module: Catalog Bootstrap
// Description: Builds the record store, search index, and sync engine.
// Purpose: Apply configuration and startup recovery policy in one place.
// Dependencies: dataset-catalog-config, dataset-catalog-core, dataset-catalog-index-sqlite
// ============================================================================

//! ## Overview
//! [`open_catalog`] turns a validated [`CatalogConfig`] into a
//! [`CatalogEngine`]. A corrupt master document stops startup unless
//! `recovery.on_corrupt_store = "start_empty"`, in which case the document is
//! quarantined and the engine starts with an empty collection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use dataset_catalog_config::CatalogConfig;
use dataset_catalog_config::CorruptStorePolicy;
use dataset_catalog_config::IndexType;
use dataset_catalog_core::EngineError;
use dataset_catalog_core::InMemorySearchIndex;
use dataset_catalog_core::IndexFreshness;
use dataset_catalog_core::JsonRecordStore;
use dataset_catalog_core::RecordStore;
use dataset_catalog_core::SearchIndex;
use dataset_catalog_core::StoreError;
use dataset_catalog_core::SyncEngine;
use dataset_catalog_core::SystemClock;
use dataset_catalog_index_sqlite::SqliteSearchIndex;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Log target for startup events.
const LOG_TARGET: &str = "dataset_catalog::bootstrap";

/// Search index selected by configuration.
pub type CatalogIndex = Arc<dyn SearchIndex + Send + Sync>;

/// Engine assembled from configuration.
pub type CatalogEngine = SyncEngine<JsonRecordStore, CatalogIndex, SystemClock>;

/// Startup failures.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The record store could not be constructed or recovered.
    #[error("record store setup failed: {0}")]
    Store(String),
    /// The search index could not be constructed.
    #[error("search index setup failed: {0}")]
    Index(String),
    /// The engine refused to open.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

// ============================================================================
// SECTION: Bootstrap
// ============================================================================

/// Builds the engine described by `config`.
///
/// # Errors
///
/// Returns [`BootstrapError`] when a component cannot be constructed or the
/// master document is corrupt under the `fail` policy.
pub fn open_catalog(config: &CatalogConfig) -> Result<CatalogEngine, BootstrapError> {
    let store = JsonRecordStore::new(config.store.json_store_config())
        .map_err(|err| BootstrapError::Store(err.to_string()))?;
    if config.recovery.on_corrupt_store == CorruptStorePolicy::StartEmpty {
        recover_corrupt_store(&store)?;
    }
    let index = build_index(config)?;
    let engine = SyncEngine::open(store, index, SystemClock, config.query.engine_config())?;
    info!(
        target: LOG_TARGET,
        store = %config.store.path.display(),
        stale = engine.freshness() == IndexFreshness::Stale,
        "catalog opened"
    );
    Ok(engine)
}

/// Quarantines a corrupt master document so startup can proceed empty.
fn recover_corrupt_store(store: &JsonRecordStore) -> Result<(), BootstrapError> {
    let _lock = store.lock_exclusive().map_err(|err| BootstrapError::Store(err.to_string()))?;
    match store.load_all() {
        Err(StoreError::Corrupt(reason)) => {
            warn!(
                target: LOG_TARGET,
                path = %store.path().display(),
                %reason,
                "starting with an empty collection"
            );
            store.quarantine().map_err(|err| BootstrapError::Store(err.to_string()))?;
            Ok(())
        }
        Ok(_) | Err(_) => Ok(()),
    }
}

/// Constructs the configured search index backend.
fn build_index(config: &CatalogConfig) -> Result<CatalogIndex, BootstrapError> {
    match config.index.index_type {
        IndexType::Memory => Ok(Arc::new(InMemorySearchIndex::new())),
        IndexType::Sqlite => {
            let sqlite = config.index.sqlite_config().ok_or_else(|| {
                BootstrapError::Index("sqlite index requires a path".to_string())
            })?;
            let index =
                SqliteSearchIndex::new(sqlite).map_err(|err| BootstrapError::Index(err.to_string()))?;
            debug!(target: LOG_TARGET, path = %index.path().display(), "sqlite search index selected");
            Ok(Arc::new(index))
        }
    }
}
