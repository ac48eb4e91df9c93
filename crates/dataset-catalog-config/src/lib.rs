// crates/dataset-catalog-config/src/lib.rs
// ============================================================================
// Module: Dataset Catalog Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for dataset-catalog.toml semantics.
// Dependencies: dataset-catalog-core, dataset-catalog-index-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `dataset-catalog-config` defines the configuration model for the dataset
//! catalog: where the master document lives, which search index backs it,
//! query limits, corrupt-store recovery, and logging. Validation is strict
//! and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
