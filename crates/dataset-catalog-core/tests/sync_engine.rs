// crates/dataset-catalog-core/tests/sync_engine.rs
// ============================================================================
// Module: Sync Engine Tests
// Description: Write protocol, id assignment, and index consistency tests.
// Purpose: Validate that both stores agree after every committed write.
// Dependencies: dataset-catalog-core, tempfile
// ============================================================================
//! ## Overview
//! Drives the sync engine through create, update, and failure scenarios with
//! a controllable clock and a fault-injecting index.
//!
//! Security posture: a failed write must never leave a partial record behind.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use common::create;
use common::harness;
use common::id;
use dataset_catalog_core::EngineError;
use dataset_catalog_core::IndexFreshness;
use dataset_catalog_core::RecordPatch;
use dataset_catalog_core::RecordStore;
use dataset_catalog_core::SearchIndex;
use dataset_catalog_core::Timestamp;

/// Verifies the create, update, get, search, latest walkthrough.
#[test]
fn create_then_patch_then_read_back() {
    let h = harness();
    let created = h
        .engine
        .apply_update(RecordPatch {
            name: Some("A".to_string()),
            drive_url: Some("https://drive/x".to_string()),
            ..RecordPatch::default()
        })
        .expect("create");
    assert_eq!(created.id, id(1));

    h.clock.set(2_000);
    let updated = h
        .engine
        .apply_update(RecordPatch {
            id: Some(id(1)),
            description: Some("cleaned".to_string()),
            ..RecordPatch::default()
        })
        .expect("update");
    assert_eq!(updated.id, id(1));
    assert_eq!(updated.name, "A");
    assert_eq!(updated.description.as_deref(), Some("cleaned"));
    assert_eq!(updated.created_at, created.created_at);

    let query = h.engine.query();
    assert_eq!(query.get_by_id(id(1)).expect("get"), updated);
    let hits = query.search("cleaned", None).expect("search");
    assert!(hits.iter().any(|record| record.id == id(1)));
    assert_eq!(query.latest(Some(1)).expect("latest"), vec![updated]);
}

/// Verifies repeating one payload keeps one record and advances `updated_at`.
#[test]
fn repeated_update_is_idempotent_and_advances_updated_at() {
    let h = harness();
    h.engine.apply_update(create("weather", &[])).expect("create");
    let patch = RecordPatch {
        id: Some(id(1)),
        description: Some("daily".to_string()),
        rows: Some(10),
        ..RecordPatch::default()
    };

    let first = h.engine.apply_update(patch.clone()).expect("first");
    let second = h.engine.apply_update(patch).expect("second");

    let all = h.engine.query().list_all().expect("list");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0], second);
    assert_eq!(second.rows, Some(10));
    assert!(first.updated_at > Timestamp::from_unix_millis(1_000));
    assert!(second.updated_at > first.updated_at);
}

/// Verifies a clock that moves backwards still advances `updated_at`.
#[test]
fn backwards_clock_still_advances_updated_at() {
    let h = harness();
    h.clock.set(5_000);
    let created = h.engine.apply_update(create("ledger", &[])).expect("create");
    h.clock.set(100);
    let updated = h
        .engine
        .apply_update(RecordPatch { id: Some(created.id), rows: Some(1), ..RecordPatch::default() })
        .expect("update");
    assert_eq!(updated.updated_at, Timestamp::from_unix_millis(5_001));
}

/// Verifies ids are max+1 and an unknown id creates a new record.
#[test]
fn unknown_id_creates_record_with_fresh_id() {
    let h = harness();
    h.engine.apply_update(create("one", &[])).expect("one");
    h.engine.apply_update(create("two", &[])).expect("two");

    let mut patch = create("three", &[]);
    patch.id = Some(id(99));
    let created = h.engine.apply_update(patch).expect("three");
    assert_eq!(created.id, id(3));
    assert!(matches!(h.engine.query().get_by_id(id(99)), Err(EngineError::NotFound(_))));
}

/// Verifies invalid patches touch neither store.
#[test]
fn validation_failure_leaves_stores_untouched() {
    let h = harness();
    h.engine.apply_update(create("kept", &[])).expect("create");
    let before = common::store_in(&h.dir).load_all().expect("load");

    let missing_url = RecordPatch { name: Some("no url".to_string()), ..RecordPatch::default() };
    assert!(matches!(h.engine.apply_update(missing_url), Err(EngineError::Validation(_))));
    let bad_url = RecordPatch {
        id: Some(id(1)),
        drive_url: Some("ftp://nope".to_string()),
        ..RecordPatch::default()
    };
    assert!(matches!(h.engine.apply_update(bad_url), Err(EngineError::Validation(_))));

    assert_eq!(common::store_in(&h.dir).load_all().expect("load"), before);
    assert_eq!(h.index.inner.list_all().expect("index"), before);
}

/// Verifies an index write failure is absorbed and healed by rebuild.
#[test]
fn failed_upsert_recovers_through_rebuild() {
    let h = harness();
    h.index.faults.fail_upsert.store(true, Ordering::SeqCst);

    let record = h.engine.apply_update(create("orders", &["sales"])).expect("write succeeds");

    assert_eq!(h.engine.freshness(), IndexFreshness::Fresh);
    assert_eq!(h.index.inner.get_by_id(record.id).expect("index"), Some(record.clone()));
    assert_eq!(h.engine.query().get_by_id(record.id).expect("get"), record);
}

/// Verifies reads fall back to the store while the index cannot recover.
#[test]
fn stale_index_serves_reads_from_store_until_rebuilt() {
    let h = harness();
    h.engine.apply_update(create("orders", &["sales"])).expect("seed");
    h.index.faults.set_all(true);
    h.clock.set(2_000);

    let record = h.engine.apply_update(create("returns", &["sales"])).expect("write succeeds");
    assert_eq!(h.engine.freshness(), IndexFreshness::Stale);
    assert_eq!(h.index.inner.get_by_id(record.id).expect("inner"), None);

    let query = h.engine.query();
    assert_eq!(query.get_by_id(record.id).expect("fallback get"), record);
    let hits = query.search("sales", None).expect("fallback search");
    assert_eq!(hits.len(), 2);
    assert_eq!(query.latest(None).expect("fallback latest"), vec![record.clone()]);

    h.index.faults.set_all(false);
    assert_eq!(query.get_by_id(record.id).expect("healed get"), record);
    assert_eq!(h.engine.freshness(), IndexFreshness::Fresh);
    assert_eq!(h.index.inner.get_by_id(record.id).expect("inner"), Some(record));
}

/// Verifies a read-time index failure marks the index stale and falls back.
#[test]
fn index_read_failure_falls_back_to_store() {
    let h = harness();
    let record = h.engine.apply_update(create("orders", &[])).expect("seed");
    h.index.faults.fail_reads.store(true, Ordering::SeqCst);
    h.index.faults.fail_rebuild.store(true, Ordering::SeqCst);

    assert_eq!(h.engine.query().list_all().expect("list"), vec![record]);
    assert_eq!(h.engine.freshness(), IndexFreshness::Stale);
}

/// Verifies explicit reconciliation surfaces index failures.
#[test]
fn reconcile_reports_rebuild_failure_and_recovers() {
    let h = harness();
    h.engine.apply_update(create("orders", &[])).expect("seed");
    h.index.faults.fail_rebuild.store(true, Ordering::SeqCst);
    assert!(matches!(h.engine.reconcile(), Err(EngineError::IndexUnavailable(_))));
    assert_eq!(h.engine.freshness(), IndexFreshness::Stale);

    h.index.faults.fail_rebuild.store(false, Ordering::SeqCst);
    assert_eq!(h.engine.reconcile().expect("reconcile"), 1);
    assert_eq!(h.engine.freshness(), IndexFreshness::Fresh);
}

/// Verifies a store write failure aborts before the index is touched.
#[test]
fn store_write_failure_leaves_index_untouched() {
    let h = harness();
    let kept = h.engine.apply_update(create("kept", &[])).expect("seed");
    let rebuilds = h.index.faults.rebuilds.load(Ordering::SeqCst);

    let file_name = "datasets.json";
    // The store has written twice: the empty init and the seed record.
    for attempt in 2 ..= 17 {
        let temp = h.dir.path().join(format!(".{file_name}.tmp.{}.{attempt}", std::process::id()));
        std::fs::create_dir(temp).expect("block temp path");
    }

    let result = h.engine.apply_update(create("lost", &[]));
    assert!(matches!(result, Err(EngineError::StoreUnwritable(_))));
    assert_eq!(h.index.inner.list_all().expect("index"), vec![kept.clone()]);
    assert_eq!(h.index.faults.rebuilds.load(Ordering::SeqCst), rebuilds);
    assert_eq!(h.engine.query().list_all().expect("list"), vec![kept]);
}

/// Verifies concurrent writers never lose or share ids.
#[test]
fn concurrent_writers_get_distinct_ids() {
    let h = harness();
    let engine = Arc::new(h.engine);
    let writers = 16;

    let handles: Vec<_> = (0 .. writers)
        .map(|n| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.apply_update(create(&format!("dataset {n}"), &["batch"])).expect("write")
            })
        })
        .collect();
    let committed: Vec<_> = handles.into_iter().map(|handle| handle.join().expect("join")).collect();

    let ids: BTreeSet<_> = committed.iter().map(|record| record.id).collect();
    assert_eq!(ids.len(), writers);
    let stored = engine.query().list_all().expect("list");
    assert_eq!(stored.len(), writers);
    for record in committed {
        assert!(stored.contains(&record));
    }
}

/// Verifies opening an engine over existing data indexes it.
#[test]
fn open_rebuilds_index_from_existing_store() {
    let h = harness();
    let record = h.engine.apply_update(create("persisted", &["kept"])).expect("seed");
    drop(h.engine);

    let index = common::FlakyIndex::default();
    let engine = dataset_catalog_core::SyncEngine::open(
        common::store_in(&h.dir),
        index.clone(),
        common::ManualClock::at(9_000),
        dataset_catalog_core::SyncEngineConfig::default(),
    )
    .expect("reopen");
    assert_eq!(engine.freshness(), IndexFreshness::Fresh);
    assert_eq!(index.inner.list_all().expect("index"), vec![record]);
}

/// Verifies a failed startup rebuild leaves the engine usable but stale.
#[test]
fn open_with_failing_index_starts_stale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = common::FlakyIndex::default();
    index.faults.set_all(true);
    let engine = dataset_catalog_core::SyncEngine::open(
        common::store_in(&dir),
        index,
        common::ManualClock::at(1),
        dataset_catalog_core::SyncEngineConfig::default(),
    )
    .expect("open");
    assert_eq!(engine.freshness(), IndexFreshness::Stale);
    let record = engine.apply_update(create("first", &[])).expect("write");
    assert_eq!(engine.query().list_all().expect("list"), vec![record]);
    assert!(engine.health().is_healthy());
}

/// Verifies engines over one document in separate handles never lose writes.
#[test]
fn separate_engines_on_one_store_serialize_writes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let open_engine = || {
        Arc::new(
            dataset_catalog_core::SyncEngine::open(
                common::store_in(&dir),
                common::FlakyIndex::default(),
                common::ManualClock::at(1_000),
                dataset_catalog_core::SyncEngineConfig::default(),
            )
            .expect("open"),
        )
    };
    let engines = [open_engine(), open_engine()];
    let per_engine = 8;

    let handles: Vec<_> = engines
        .iter()
        .flat_map(|engine| (0 .. per_engine).map(move |n| (Arc::clone(engine), n)))
        .enumerate()
        .map(|(slot, (engine, n))| {
            thread::spawn(move || {
                engine.apply_update(create(&format!("dataset {slot} {n}"), &[])).expect("write")
            })
        })
        .collect();
    let committed: Vec<_> = handles.into_iter().map(|handle| handle.join().expect("join")).collect();

    let ids: BTreeSet<_> = committed.iter().map(|record| record.id).collect();
    assert_eq!(ids.len(), per_engine * 2);
    let stored = common::store_in(&dir).load_all().expect("load");
    assert_eq!(stored.len(), per_engine * 2);
    for record in committed {
        assert!(stored.contains(&record));
    }
}

/// Verifies a read served by the store scan never creates the document.
#[test]
fn stale_fallback_read_never_creates_document() {
    let h = harness();
    let path = common::store_in(&h.dir).path().to_path_buf();
    std::fs::remove_file(&path).expect("remove document");
    h.index.faults.fail_reads.store(true, Ordering::SeqCst);
    h.index.faults.fail_rebuild.store(true, Ordering::SeqCst);

    let query = h.engine.query();
    assert_eq!(query.list_all().expect("list"), Vec::new());
    assert_eq!(h.engine.freshness(), IndexFreshness::Stale);
    assert_eq!(query.search("anything", None).expect("search"), Vec::new());
    assert!(matches!(query.get_by_id(id(1)), Err(EngineError::NotFound(_))));
    assert!(!path.exists());
}

/// Verifies a rejected patch does not create a missing document.
#[test]
fn rejected_patch_never_creates_document() {
    let h = harness();
    let path = common::store_in(&h.dir).path().to_path_buf();
    std::fs::remove_file(&path).expect("remove document");

    let missing_url = RecordPatch { name: Some("no url".to_string()), ..RecordPatch::default() };
    assert!(matches!(h.engine.apply_update(missing_url), Err(EngineError::Validation(_))));
    assert!(!path.exists());
}

/// Verifies reopening over an index that already matches the store skips the rebuild.
#[test]
fn open_skips_rebuild_when_index_matches_store() {
    let h = harness();
    let record = h.engine.apply_update(create("persisted", &["kept"])).expect("seed");
    drop(h.engine);
    let rebuilds = h.index.faults.rebuilds.load(Ordering::SeqCst);

    let reopen = || {
        dataset_catalog_core::SyncEngine::open(
            common::store_in(&h.dir),
            h.index.clone(),
            common::ManualClock::at(9_000),
            dataset_catalog_core::SyncEngineConfig::default(),
        )
        .expect("reopen")
    };
    let engine = reopen();
    assert_eq!(engine.freshness(), IndexFreshness::Fresh);
    assert_eq!(h.index.faults.rebuilds.load(Ordering::SeqCst), rebuilds);
    drop(engine);

    h.index.inner.rebuild_from(&[]).expect("diverge index");
    let engine = reopen();
    assert_eq!(engine.freshness(), IndexFreshness::Fresh);
    assert_eq!(h.index.faults.rebuilds.load(Ordering::SeqCst), rebuilds + 1);
    assert_eq!(h.index.inner.list_all().expect("index"), vec![record]);
}

/// Verifies opening over a missing document initializes it empty.
#[test]
fn open_initializes_missing_document() {
    let h = harness();
    let path = common::store_in(&h.dir).path().to_path_buf();
    assert!(path.exists());
    assert!(h.dir.path().join("datasets.json.lock").exists());
    assert_eq!(common::store_in(&h.dir).load_all().expect("load"), Vec::new());
}
