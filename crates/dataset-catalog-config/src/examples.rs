// crates/dataset-catalog-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `dataset-catalog` tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for dataset catalog configuration. Every key is shown
//! with its default value except where noted.

/// Returns a canonical example `dataset-catalog.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[store]
path = "datasets.json"
max_document_bytes = 67108864

[index]
type = "sqlite"
# Defaults to "datasets.db" in the working directory.
# path = "datasets.db"
journal_mode = "wal"
sync_mode = "normal"
busy_timeout_ms = 5000
read_pool_size = 2

[query]
default_search_limit = 50
default_latest_count = 1
max_limit = 500

[recovery]
# "fail" refuses to start on a corrupt master document; "start_empty"
# quarantines it and starts with an empty collection.
on_corrupt_store = "fail"

[logging]
level = "info"
format = "text"
"#,
    )
}
