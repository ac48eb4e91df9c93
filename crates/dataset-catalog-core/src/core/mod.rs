// crates/dataset-catalog-core/src/core/mod.rs
// ============================================================================
// Module: Dataset Catalog Core Types
// Description: Canonical record, patch, identifier, time, and search types.
// Purpose: Provide stable, serializable types shared by both stores.
// Dependencies: serde, url
// ============================================================================

//! ## Overview
//! Core types are the single source of truth for what a dataset record is and
//! how it is searched. The record store, the search index, and every API
//! surface derive from them.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod patch;
pub mod record;
pub mod search;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::DatasetId;
pub use identifiers::ParseDatasetIdError;
pub use patch::RecordPatch;
pub use patch::ValidationError;
pub use record::CatalogStats;
pub use record::DatasetRecord;
pub use search::SearchQuery;
pub use time::Timestamp;
