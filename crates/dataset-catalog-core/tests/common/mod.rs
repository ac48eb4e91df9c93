// crates/dataset-catalog-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Controllable clock, fault-injecting index, and sample patches.
// Purpose: Drive sync engine scenarios deterministically across test files.
// Dependencies: dataset-catalog-core, tempfile
// ============================================================================
//! ## Overview
//! Fixtures shared by the integration tests. Not every test file uses every
//! helper.

#![allow(dead_code, reason = "Each test binary uses a different subset of fixtures.")]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use dataset_catalog_core::Clock;
use dataset_catalog_core::DatasetId;
use dataset_catalog_core::DatasetRecord;
use dataset_catalog_core::InMemorySearchIndex;
use dataset_catalog_core::IndexError;
use dataset_catalog_core::JsonRecordStore;
use dataset_catalog_core::JsonStoreConfig;
use dataset_catalog_core::RecordPatch;
use dataset_catalog_core::SearchIndex;
use dataset_catalog_core::SearchQuery;
use dataset_catalog_core::SyncEngine;
use dataset_catalog_core::SyncEngineConfig;
use dataset_catalog_core::Timestamp;
use tempfile::TempDir;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Clock whose time is set by the test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at(millis: i64) -> Self {
        Self { millis: Arc::new(AtomicI64::new(millis)) }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: Fault Injection
// ============================================================================

/// Switches controlling which index operations fail.
#[derive(Debug, Default)]
pub struct Faults {
    pub fail_upsert: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_rebuild: AtomicBool,
    pub rebuilds: AtomicUsize,
}

impl Faults {
    pub fn set_all(&self, failing: bool) {
        self.fail_upsert.store(failing, Ordering::SeqCst);
        self.fail_reads.store(failing, Ordering::SeqCst);
        self.fail_rebuild.store(failing, Ordering::SeqCst);
    }
}

/// In-memory index that fails on demand.
#[derive(Debug, Clone, Default)]
pub struct FlakyIndex {
    pub inner: InMemorySearchIndex,
    pub faults: Arc<Faults>,
}

impl FlakyIndex {
    fn check(flag: &AtomicBool) -> Result<(), IndexError> {
        if flag.load(Ordering::SeqCst) {
            return Err(IndexError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl SearchIndex for FlakyIndex {
    fn upsert(&self, record: &DatasetRecord) -> Result<(), IndexError> {
        Self::check(&self.faults.fail_upsert)?;
        self.inner.upsert(record)
    }

    fn get_by_id(&self, id: DatasetId) -> Result<Option<DatasetRecord>, IndexError> {
        Self::check(&self.faults.fail_reads)?;
        self.inner.get_by_id(id)
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<DatasetRecord>, IndexError> {
        Self::check(&self.faults.fail_reads)?;
        self.inner.search(query)
    }

    fn latest(&self, count: usize) -> Result<Vec<DatasetRecord>, IndexError> {
        Self::check(&self.faults.fail_reads)?;
        self.inner.latest(count)
    }

    fn list_all(&self) -> Result<Vec<DatasetRecord>, IndexError> {
        Self::check(&self.faults.fail_reads)?;
        self.inner.list_all()
    }

    fn rebuild_from(&self, records: &[DatasetRecord]) -> Result<(), IndexError> {
        Self::check(&self.faults.fail_rebuild)?;
        self.faults.rebuilds.fetch_add(1, Ordering::SeqCst);
        self.inner.rebuild_from(records)
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

pub type TestEngine = SyncEngine<JsonRecordStore, FlakyIndex, ManualClock>;

/// Engine over a fresh temp directory plus handles to its fixtures.
pub struct Harness {
    pub dir: TempDir,
    pub engine: TestEngine,
    pub index: FlakyIndex,
    pub clock: ManualClock,
}

pub fn store_in(dir: &TempDir) -> JsonRecordStore {
    JsonRecordStore::new(JsonStoreConfig::new(dir.path().join("datasets.json"))).expect("store")
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = FlakyIndex::default();
    let clock = ManualClock::at(1_000);
    let engine = SyncEngine::open(
        store_in(&dir),
        index.clone(),
        clock.clone(),
        SyncEngineConfig::default(),
    )
    .expect("open engine");
    Harness { dir, engine, index, clock }
}

pub fn create(name: &str, tags: &[&str]) -> RecordPatch {
    RecordPatch {
        name: Some(name.to_string()),
        drive_url: Some(format!("https://drive.example.com/{}", name.replace(' ', "-"))),
        tags: Some(tags.iter().map(|tag| (*tag).to_string()).collect()),
        ..RecordPatch::default()
    }
}

pub fn id(raw: u64) -> DatasetId {
    DatasetId::from_raw(raw).expect("nonzero id")
}
