// crates/dataset-catalog-core/src/lib.rs
// ============================================================================
// Module: Dataset Catalog Core Library
// Description: Public API surface for the dataset catalog core.
// Purpose: Expose core types, store interfaces, and the sync engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Dataset catalog core keeps a durable JSON master document and a
//! rebuildable search index in agreement. Writes go through the
//! [`SyncEngine`]; reads go through its [`QueryFacade`], which falls back to a
//! record store scan whenever the index cannot be trusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::Clock;
pub use interfaces::IndexError;
pub use interfaces::RecordStore;
pub use interfaces::SearchIndex;
pub use interfaces::StoreError;
pub use interfaces::StoreLock;
pub use interfaces::SystemClock;
pub use runtime::EngineError;
pub use runtime::HealthReport;
pub use runtime::InMemorySearchIndex;
pub use runtime::IndexFreshness;
pub use runtime::JsonRecordStore;
pub use runtime::JsonStoreConfig;
pub use runtime::QueryFacade;
pub use runtime::SyncEngine;
pub use runtime::SyncEngineConfig;
