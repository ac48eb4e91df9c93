// crates/dataset-catalog-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for dataset-catalog-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use dataset_catalog_config::CatalogConfig;
use dataset_catalog_config::ConfigError;

/// Parses a TOML string into a `CatalogConfig` without validating it.
pub fn config_from_toml(toml_str: &str) -> Result<CatalogConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<CatalogConfig, toml::de::Error> {
    config_from_toml("")
}

/// Checks that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
