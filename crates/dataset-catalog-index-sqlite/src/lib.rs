// crates/dataset-catalog-index-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Search Index
// Description: Rebuildable SearchIndex backend using SQLite.
// Purpose: Serve ranked dataset queries from an on-disk index.
// Dependencies: dataset-catalog-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`SearchIndex`] for the dataset
//! catalog. The database is a disposable projection of the JSON record store:
//! it can be deleted at any time and is regenerated by `rebuild_from`.
//!
//! [`SearchIndex`]: dataset_catalog_core::SearchIndex

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod index;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use index::SqliteIndexConfig;
pub use index::SqliteIndexError;
pub use index::SqliteJournalMode;
pub use index::SqliteSearchIndex;
pub use index::SqliteSyncMode;
