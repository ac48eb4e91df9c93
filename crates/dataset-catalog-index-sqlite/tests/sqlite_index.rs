// crates/dataset-catalog-index-sqlite/tests/sqlite_index.rs
// ============================================================================
// Module: SQLite Search Index Tests
// Description: Integration tests for the SQLite-backed search index.
// Purpose: Validate upsert, ranked search, rebuild atomicity, and self-healing.
// ============================================================================

//! ## Overview
//! Exercises the `SQLite` index directly and behind the sync engine:
//! - Upsert, lookup, listing, and recency order
//! - Ranking parity with the record store scan, including non-ASCII text
//! - Schema version reset and corrupt row detection
//! - Recovery after the database location becomes usable again

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::Path;

use dataset_catalog_core::DatasetId;
use dataset_catalog_core::DatasetRecord;
use dataset_catalog_core::IndexError;
use dataset_catalog_core::IndexFreshness;
use dataset_catalog_core::JsonRecordStore;
use dataset_catalog_core::JsonStoreConfig;
use dataset_catalog_core::RecordPatch;
use dataset_catalog_core::SearchIndex;
use dataset_catalog_core::SearchQuery;
use dataset_catalog_core::SyncEngine;
use dataset_catalog_core::SyncEngineConfig;
use dataset_catalog_core::SystemClock;
use dataset_catalog_core::Timestamp;
use dataset_catalog_core::core::search;
use dataset_catalog_index_sqlite::SqliteIndexConfig;
use dataset_catalog_index_sqlite::SqliteJournalMode;
use dataset_catalog_index_sqlite::SqliteSearchIndex;
use rusqlite::Connection;
use rusqlite::params;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn index_at(path: &Path) -> SqliteSearchIndex {
    SqliteSearchIndex::new(SqliteIndexConfig::new(path)).unwrap()
}

fn record(raw_id: u64, name: &str, description: Option<&str>, tags: &[&str], updated: i64) -> DatasetRecord {
    DatasetRecord {
        id: DatasetId::from_raw(raw_id).unwrap(),
        name: name.to_string(),
        description: description.map(str::to_string),
        drive_url: format!("https://drive.example.com/{raw_id}"),
        rows: Some(raw_id),
        columns: Some(vec!["col".to_string()]),
        tags: tags.iter().map(|tag| (*tag).to_string()).collect(),
        created_at: Timestamp::from_unix_millis(0),
        updated_at: Timestamp::from_unix_millis(updated),
    }
}

fn sample() -> Vec<DatasetRecord> {
    vec![
        record(1, "Ledger", Some("monthly SALES rollup"), &[], 10),
        record(2, "Orders", None, &["sales", "raw"], 20),
        record(3, "Sales 2024", None, &[], 30),
        record(4, "ÉTÉ Ventes", Some("données été"), &["Été"], 40),
        record(5, "weather", None, &[], 40),
    ]
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies records survive upsert and decode with every field intact.
#[test]
fn upsert_then_read_back() {
    let dir = TempDir::new().unwrap();
    let index = index_at(&dir.path().join("index.db"));
    let mut first = record(1, "first", Some("desc"), &["a"], 5);
    first.rows = None;
    first.columns = None;
    index.upsert(&first).unwrap();
    index.upsert(&record(2, "second", None, &[], 6)).unwrap();

    assert_eq!(index.get_by_id(first.id).unwrap(), Some(first.clone()));
    assert_eq!(index.get_by_id(DatasetId::from_raw(9).unwrap()).unwrap(), None);
    assert_eq!(index.list_all().unwrap().len(), 2);

    let renamed = DatasetRecord { name: "renamed".to_string(), ..first };
    index.upsert(&renamed).unwrap();
    assert_eq!(index.get_by_id(renamed.id).unwrap(), Some(renamed));
    assert_eq!(index.list_all().unwrap().len(), 2);
}

/// Verifies ranked search agrees with the linear scan, including case folding beyond ASCII.
#[test]
fn search_matches_scan_ranking() {
    let dir = TempDir::new().unwrap();
    let index = index_at(&dir.path().join("index.db"));
    let records = sample();
    index.rebuild_from(&records).unwrap();

    for text in ["sales", "SALES", "été", "ventes", "", "nothing", "a"] {
        let query = SearchQuery::new(text, 10).unwrap();
        assert_eq!(index.search(&query).unwrap(), search::rank(&records, &query), "query {text:?}");
    }
    let ids: Vec<u64> = index
        .search(&SearchQuery::new("sales", 10).unwrap())
        .unwrap()
        .iter()
        .map(|record| record.id.get())
        .collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

/// Verifies latest order and limit handling.
#[test]
fn latest_orders_by_recency_then_id() {
    let dir = TempDir::new().unwrap();
    let index = index_at(&dir.path().join("index.db"));
    let records = sample();
    index.rebuild_from(&records).unwrap();

    let ids: Vec<u64> = index.latest(3).unwrap().iter().map(|record| record.id.get()).collect();
    assert_eq!(ids, vec![4, 5, 3]);
    assert_eq!(index.latest(100).unwrap(), search::latest(&records, 100));
}

/// Verifies rebuild replaces previous contents entirely.
#[test]
fn rebuild_replaces_contents() {
    let dir = TempDir::new().unwrap();
    let index = index_at(&dir.path().join("index.db"));
    index.rebuild_from(&sample()).unwrap();
    let survivor = record(7, "only", None, &[], 1);

    index.rebuild_from(std::slice::from_ref(&survivor)).unwrap();
    assert_eq!(index.list_all().unwrap(), vec![survivor]);
    index.rebuild_from(&[]).unwrap();
    assert!(index.list_all().unwrap().is_empty());
}

/// Verifies an unknown schema version is discarded rather than trusted.
#[test]
fn schema_version_change_resets_index() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    index_at(&path).rebuild_from(&sample()).unwrap();

    let connection = Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = ?1", params![99]).unwrap();
    drop(connection);

    assert!(index_at(&path).list_all().unwrap().is_empty());
}

/// Verifies undecodable rows surface as corruption.
#[test]
fn corrupt_row_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.db");
    let index = index_at(&path);
    index.rebuild_from(&sample()).unwrap();

    let connection = Connection::open(&path).unwrap();
    connection.execute("UPDATE datasets SET tags_json = 'not json' WHERE id = 2", []).unwrap();
    drop(connection);

    assert!(matches!(index.list_all(), Err(IndexError::Corrupt(_))));
    assert!(index.get_by_id(DatasetId::from_raw(1).unwrap()).unwrap().is_some());
}

/// Verifies the index recovers once its location becomes usable.
#[test]
fn unavailable_location_heals() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocked");
    fs::write(&blocker, b"file, not a directory").unwrap();
    let index = index_at(&blocker.join("index.db"));

    assert!(matches!(index.readiness(), Err(IndexError::Unavailable(_))));
    assert!(matches!(index.upsert(&record(1, "x", None, &[], 1)), Err(IndexError::Unavailable(_))));

    fs::remove_file(&blocker).unwrap();
    index.readiness().unwrap();
    index.rebuild_from(&sample()).unwrap();
    assert_eq!(index.list_all().unwrap().len(), 5);
}

/// Verifies invalid configuration is rejected up front.
#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(SqliteSearchIndex::new(SqliteIndexConfig::new(dir.path())).is_err());
    let mut config = SqliteIndexConfig::new(dir.path().join("index.db"));
    config.read_pool_size = 0;
    assert!(SqliteSearchIndex::new(config).is_err());
}

/// Verifies the sync engine runs end to end on the `SQLite` index.
#[test]
fn sync_engine_over_sqlite_index() {
    let dir = TempDir::new().unwrap();
    let store = JsonRecordStore::new(JsonStoreConfig::new(dir.path().join("datasets.json"))).unwrap();
    let mut config = SqliteIndexConfig::new(dir.path().join("index.db"));
    config.journal_mode = SqliteJournalMode::Delete;
    let engine =
        SyncEngine::open(store, SqliteSearchIndex::new(config).unwrap(), SystemClock, SyncEngineConfig::default())
            .unwrap();

    let created = engine
        .apply_update(RecordPatch {
            name: Some("A".to_string()),
            drive_url: Some("https://drive/x".to_string()),
            ..RecordPatch::default()
        })
        .unwrap();
    let updated = engine
        .apply_update(RecordPatch {
            id: Some(created.id),
            description: Some("cleaned".to_string()),
            ..RecordPatch::default()
        })
        .unwrap();

    assert_eq!(engine.freshness(), IndexFreshness::Fresh);
    let query = engine.query();
    assert_eq!(query.get_by_id(created.id).unwrap(), updated);
    assert_eq!(query.search("cleaned", None).unwrap(), vec![updated.clone()]);
    assert_eq!(query.latest(Some(1)).unwrap(), vec![updated]);
}
