// crates/dataset-catalog-config/src/config.rs
// ============================================================================
// Module: Dataset Catalog Configuration
// Description: Configuration loading and validation for the dataset catalog.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: dataset-catalog-core, dataset-catalog-index-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section has defaults, so an empty file is a valid configuration.
//! Unknown keys and invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use dataset_catalog_core::JsonStoreConfig;
use dataset_catalog_core::SyncEngineConfig;
use dataset_catalog_core::runtime::engine::DEFAULT_LATEST_COUNT;
use dataset_catalog_core::runtime::engine::DEFAULT_MAX_LIMIT;
use dataset_catalog_core::runtime::engine::DEFAULT_SEARCH_LIMIT;
use dataset_catalog_core::runtime::json_store::DEFAULT_MAX_DOCUMENT_BYTES;
use dataset_catalog_index_sqlite::SqliteIndexConfig;
use dataset_catalog_index_sqlite::SqliteJournalMode;
use dataset_catalog_index_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "dataset-catalog.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "DATASET_CATALOG_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Hard ceiling for `query.max_limit`.
pub(crate) const MAX_QUERY_LIMIT: usize = 10_000;
/// Maximum length of the logging filter directive.
pub(crate) const MAX_LOG_LEVEL_LENGTH: usize = 512;
/// Default master document path.
const DEFAULT_STORE_PATH: &str = "datasets.json";
/// Default `SQLite` index path.
const DEFAULT_INDEX_PATH: &str = "datasets.db";
/// Default `SQLite` busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default `SQLite` read pool size.
const DEFAULT_READ_POOL_SIZE: usize = 2;
/// Maximum `SQLite` read pool size.
const MAX_READ_POOL_SIZE: usize = 64;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Dataset catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Record store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Search index configuration.
    #[serde(default)]
    pub index: IndexConfig,
    /// Query limit configuration.
    #[serde(default)]
    pub query: QueryConfig,
    /// Startup recovery configuration.
    #[serde(default)]
    pub recovery: RecoveryConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CatalogConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        Self::load_from(&resolved)
    }

    /// Loads configuration, falling back to defaults when no file is named.
    ///
    /// Defaults apply only when neither `path` nor the environment variable
    /// is set and the default file does not exist. An explicitly named file
    /// that is missing is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some() || env::var_os(CONFIG_ENV_VAR).is_some();
        let resolved = resolve_path(path)?;
        if !explicit && !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from(&resolved)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the file at `path`.
    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.index.validate()?;
        self.query.validate()?;
        self.logging.validate()?;
        if let Some(index_path) = self.index.sqlite_path()
            && index_path == self.store.path
        {
            return Err(ConfigError::Invalid(
                "index.path must differ from store.path".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Record store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the master JSON document.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Maximum accepted document size in bytes.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

impl StoreConfig {
    /// Validates record store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path)?;
        if self.max_document_bytes == 0 {
            return Err(ConfigError::Invalid(
                "store.max_document_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the JSON record store configuration.
    #[must_use]
    pub fn json_store_config(&self) -> JsonStoreConfig {
        JsonStoreConfig {
            path: self.path.clone(),
            max_document_bytes: self.max_document_bytes,
        }
    }
}

/// Returns the default master document path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Returns the default document size limit.
const fn default_max_document_bytes() -> usize {
    DEFAULT_MAX_DOCUMENT_BYTES
}

// ============================================================================
// SECTION: Index
// ============================================================================

/// Search index backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// Use the in-memory index, rebuilt on every start.
    Memory,
    /// Use the `SQLite`-backed index.
    #[default]
    Sqlite,
}

/// Search index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// Index backend type.
    #[serde(rename = "type", default)]
    pub index_type: IndexType,
    /// `SQLite` database path; defaults to `datasets.db` for the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of pooled read connections.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_type: IndexType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

impl IndexConfig {
    /// Validates search index configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.index_type {
            IndexType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory index must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            IndexType::Sqlite => {
                if let Some(path) = &self.path {
                    validate_path_string("index.path", path)?;
                }
                if self.read_pool_size == 0 || self.read_pool_size > MAX_READ_POOL_SIZE {
                    return Err(ConfigError::Invalid(format!(
                        "index.read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Returns the effective `SQLite` database path for the sqlite backend.
    #[must_use]
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        match self.index_type {
            IndexType::Memory => None,
            IndexType::Sqlite => {
                Some(self.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)))
            }
        }
    }

    /// Returns the `SQLite` index configuration for the sqlite backend.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteIndexConfig> {
        self.sqlite_path().map(|path| SqliteIndexConfig {
            path,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
            read_pool_size: self.read_pool_size,
        })
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

// ============================================================================
// SECTION: Query
// ============================================================================

/// Query limit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Search result count when the caller gives no limit.
    #[serde(default = "default_search_limit")]
    pub default_search_limit: usize,
    /// `latest` count when the caller gives none.
    #[serde(default = "default_latest_count")]
    pub default_latest_count: usize,
    /// Largest limit a caller may request.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_search_limit: default_search_limit(),
            default_latest_count: default_latest_count(),
            max_limit: default_max_limit(),
        }
    }
}

impl QueryConfig {
    /// Validates query limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit > MAX_QUERY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "query.max_limit must not exceed {MAX_QUERY_LIMIT}"
            )));
        }
        self.engine_config()
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("query: {err}")))
    }

    /// Returns the sync engine configuration for these limits.
    #[must_use]
    pub const fn engine_config(&self) -> SyncEngineConfig {
        SyncEngineConfig {
            default_search_limit: self.default_search_limit,
            default_latest_count: self.default_latest_count,
            max_limit: self.max_limit,
        }
    }
}

/// Returns the default search limit.
const fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// Returns the default `latest` count.
const fn default_latest_count() -> usize {
    DEFAULT_LATEST_COUNT
}

/// Returns the default maximum limit.
const fn default_max_limit() -> usize {
    DEFAULT_MAX_LIMIT
}

// ============================================================================
// SECTION: Recovery
// ============================================================================

/// What to do when the master document is corrupt at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorruptStorePolicy {
    /// Refuse to start.
    #[default]
    Fail,
    /// Quarantine the document and start with an empty collection.
    StartEmpty,
}

/// Startup recovery configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecoveryConfig {
    /// Corrupt master document policy.
    #[serde(default)]
    pub on_corrupt_store: CorruptStorePolicy,
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `dataset_catalog::index=debug`.
    ///
    /// `RUST_LOG` overrides this when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.trim();
        if level.is_empty() {
            return Err(ConfigError::Invalid("logging.level must be non-empty".to_string()));
        }
        if level.len() > MAX_LOG_LEVEL_LENGTH {
            return Err(ConfigError::Invalid("logging.level exceeds max length".to_string()));
        }
        if level.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(
                "logging.level must not contain control characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default log filter.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured file path against length constraints.
fn validate_path_string(field: &str, path: &Path) -> Result<(), ConfigError> {
    let value = path.to_string_lossy();
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
