// crates/dataset-catalog-cli/src/lib.rs
// ============================================================================
// Module: Dataset Catalog CLI Library
// Description: Shared helpers for the dataset catalog command-line interface.
// Purpose: Keep engine wiring and logging setup testable outside the binary.
// Dependencies: dataset-catalog-config, dataset-catalog-core, tracing-subscriber
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) parses arguments and prints JSON.
//! Everything it needs to turn a [`dataset_catalog_config::CatalogConfig`]
//! into a running engine lives here so integration tests can drive it
//! directly.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Engine construction from configuration.
pub mod bootstrap;
/// Tracing subscriber installation.
pub mod logging;
/// JSON output views.
pub mod output;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bootstrap::BootstrapError;
pub use bootstrap::CatalogEngine;
pub use bootstrap::CatalogIndex;
pub use bootstrap::open_catalog;
pub use logging::LoggingError;
pub use logging::init_logging;
