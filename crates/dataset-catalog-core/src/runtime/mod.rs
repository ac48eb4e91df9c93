// crates/dataset-catalog-core/src/runtime/mod.rs
// ============================================================================
// Module: Dataset Catalog Runtime
// Description: Sync engine, query facade, and bundled store implementations.
// Purpose: Keep the record store and search index consistent and serve reads.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the write protocol, the read fallback policy,
//! the JSON record store, and the in-memory index. All API surfaces must call
//! into the same engine so the consistency contract holds everywhere.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod engine;
pub mod json_store;
pub mod memory_index;
pub mod query;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use engine::EngineError;
pub use engine::HealthReport;
pub use engine::IndexFreshness;
pub use engine::SyncEngine;
pub use engine::SyncEngineConfig;
pub use json_store::JsonRecordStore;
pub use json_store::JsonStoreConfig;
pub use memory_index::InMemorySearchIndex;
pub use query::QueryFacade;
