// crates/dataset-catalog-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Installs the global tracing subscriber.
// Purpose: Route component logs to stderr so stdout stays machine-readable.
// Dependencies: dataset-catalog-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` wins over `logging.level` when it is set and non-empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;

use dataset_catalog_config::LogFormat;
use dataset_catalog_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Environment variable overriding the configured filter.
pub const LOG_ENV_VAR: &str = "RUST_LOG";

/// Subscriber installation failure.
#[derive(Debug, Error)]
#[error("logging setup failed: {0}")]
pub struct LoggingError(String);

/// Resolves the filter directive from the environment or configuration.
#[must_use]
pub fn filter_directive(config: &LoggingConfig, env_value: Option<&str>) -> String {
    env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| config.level.trim().to_string(), str::to_string)
}

/// Installs the global subscriber writing to stderr.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter does not parse or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_value = env::var(LOG_ENV_VAR).ok();
    let directive = filter_directive(config, env_value.as_deref());
    let filter = EnvFilter::try_new(&directive).map_err(|err| LoggingError(err.to_string()))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| LoggingError(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
