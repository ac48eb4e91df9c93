// crates/dataset-catalog-core/src/runtime/engine.rs
// ============================================================================
// Module: Dataset Catalog Sync Engine
// Description: Write protocol and consistency contract between both stores.
// Purpose: Serialize writes into the record store and propagate them to the index.
// Dependencies: crate::{core, interfaces}, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! The sync engine is the only component allowed to mutate the record store
//! or the search index. Every write follows the same protocol:
//!
//! 1. validate the patch,
//! 2. take the collection-wide write lock (in-process mutex plus the record
//!    store's cross-process lock),
//! 3. load the whole collection and merge or create the record,
//! 4. atomically replace the record store document,
//! 5. upsert the committed record into the index.
//!
//! A record store failure aborts the write before the index is touched. An
//! index failure never fails the write: the index is marked stale and a
//! synchronous rebuild from the committed collection is attempted at once.
//!
//! ## Index freshness
//! `Fresh -> Stale` happens on any failed index write or read.
//! `Stale -> Fresh` happens only after a successful `rebuild_from`, or at
//! open when the index already lists exactly the stored collection.
//! Reads that find the index stale attempt one reconciliation under the write
//! lock; if that fails they are served by scanning the record store. Readers
//! therefore never observe an index that has silently diverged.
//!
//! Opening compares the index against the record store and only rebuilds
//! when the two differ, so short-lived processes do not pay for a full
//! rebuild on every start.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::DatasetId;
use crate::core::DatasetRecord;
use crate::core::RecordPatch;
use crate::core::Timestamp;
use crate::core::ValidationError;
use crate::interfaces::Clock;
use crate::interfaces::IndexError;
use crate::interfaces::RecordStore;
use crate::interfaces::SearchIndex;
use crate::interfaces::StoreError;
use crate::interfaces::StoreLock;
use crate::runtime::query::QueryFacade;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tracing target for sync engine events.
const LOG_TARGET: &str = "dataset_catalog::engine";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by the sync engine and query facade.
///
/// # Invariants
/// - Index failures are only surfaced by explicit reconciliation; reads and
///   writes absorb them.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The request was malformed; no store was touched.
    #[error("validation error: {0}")]
    Validation(String),
    /// No record has the requested identifier.
    #[error("dataset not found: {0}")]
    NotFound(DatasetId),
    /// The master document is unreadable.
    #[error("record store corrupt: {0}")]
    StoreCorrupt(String),
    /// The master document could not be written; prior state is intact.
    #[error("record store unwritable: {0}")]
    StoreUnwritable(String),
    /// The master document could not be read.
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),
    /// An explicit reconciliation could not rebuild the index.
    #[error("search index unavailable: {0}")]
    IndexUnavailable(String),
}

impl From<ValidationError> for EngineError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error.0)
    }
}

/// Maps a record store error raised while reading.
fn store_read_error(error: StoreError) -> EngineError {
    match error {
        StoreError::Corrupt(message) | StoreError::Invalid(message) => {
            EngineError::StoreCorrupt(message)
        }
        StoreError::Io(message) => EngineError::StoreUnavailable(message),
        StoreError::Unwritable(message) => EngineError::StoreUnwritable(message),
    }
}

/// Maps a record store error raised while acquiring the write lock.
fn store_lock_error(error: StoreError) -> EngineError {
    EngineError::StoreUnavailable(error.to_string())
}

/// Maps a record store error raised while writing.
fn store_write_error(error: StoreError) -> EngineError {
    match error {
        StoreError::Corrupt(message) => EngineError::StoreCorrupt(message),
        StoreError::Unwritable(message) | StoreError::Io(message) | StoreError::Invalid(message) => {
            EngineError::StoreUnwritable(message)
        }
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 50;
/// Default number of records returned by `latest`.
pub const DEFAULT_LATEST_COUNT: usize = 1;
/// Default upper bound for any caller-supplied limit.
pub const DEFAULT_MAX_LIMIT: usize = 500;

/// Sync engine and query facade configuration.
///
/// # Invariants
/// - Every field is at least 1 and both defaults are at most `max_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEngineConfig {
    /// Result count used when a search omits its limit.
    pub default_search_limit: usize,
    /// Record count used when `latest` omits its count.
    pub default_latest_count: usize,
    /// Largest limit a caller may request.
    pub max_limit: usize,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            default_search_limit: DEFAULT_SEARCH_LIMIT,
            default_latest_count: DEFAULT_LATEST_COUNT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl SyncEngineConfig {
    /// Validates limit relationships.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when a limit is zero or a default
    /// exceeds `max_limit`.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_limit == 0 || self.default_search_limit == 0 || self.default_latest_count == 0 {
            return Err(EngineError::Validation("query limits must be greater than zero".to_string()));
        }
        if self.default_search_limit > self.max_limit || self.default_latest_count > self.max_limit {
            return Err(EngineError::Validation(
                "default query limits must not exceed max_limit".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Freshness
// ============================================================================

/// Whether the search index reflects every committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexFreshness {
    /// The index reflects the record store.
    Fresh,
    /// The index may lag the record store and must be rebuilt before use.
    Stale,
}

/// Readiness snapshot for both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Record store readiness error, if any.
    pub store_error: Option<String>,
    /// Search index readiness error, if any.
    pub index_error: Option<String>,
    /// Current index freshness.
    pub freshness: IndexFreshness,
}

impl HealthReport {
    /// Returns true when the record store is usable.
    ///
    /// A degraded index does not make the catalog unhealthy.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.store_error.is_none()
    }
}

// ============================================================================
// SECTION: Sync Engine
// ============================================================================

/// Held for the duration of a write or reconciliation.
struct WriteGuard<'a> {
    /// Cross-process store lock; released before the mutex.
    _process: StoreLock,
    /// In-process serialization.
    _thread: MutexGuard<'a, ()>,
}

/// Sync engine owning write access to the record store and search index.
///
/// # Invariants
/// - At most one write or reconciliation runs at a time.
/// - The index is only marked fresh after a successful full rebuild or an
///   exact match against the store at open.
pub struct SyncEngine<S, I, C> {
    /// Durable master store.
    store: S,
    /// Rebuildable secondary index.
    index: I,
    /// Timestamp source.
    clock: C,
    /// Engine configuration.
    config: SyncEngineConfig,
    /// Collection-wide write serialization.
    write_lock: Mutex<()>,
    /// Set while the index may lag the record store.
    stale: AtomicBool,
}

impl<S, I, C> SyncEngine<S, I, C>
where
    S: RecordStore,
    I: SearchIndex,
    C: Clock,
{
    /// Opens the engine and synchronizes the index with the record store.
    ///
    /// A missing record store document is initialized empty under the write
    /// lock. The index is rebuilt only when its contents differ from the
    /// store; a rebuild failure leaves the engine stale instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an invalid configuration, and
    /// [`EngineError::StoreCorrupt`] or [`EngineError::StoreUnavailable`] when
    /// the record store cannot be read.
    pub fn open(store: S, index: I, clock: C, config: SyncEngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let engine = Self {
            store,
            index,
            clock,
            config,
            write_lock: Mutex::new(()),
            stale: AtomicBool::new(true),
        };
        let count = {
            let _guard = engine.lock_writes()?;
            if let Err(err) = engine.store.initialize() {
                warn!(target: LOG_TARGET, error = %err, "record store could not be initialized");
            }
            let records = engine.store.load_all().map_err(store_read_error)?;
            engine.sync_index(&records);
            records.len()
        };
        info!(
            target: LOG_TARGET,
            records = count,
            stale = engine.freshness() == IndexFreshness::Stale,
            "sync engine opened"
        );
        Ok(engine)
    }

    /// Applies a create-or-update patch and returns the committed record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for malformed patches and
    /// [`EngineError::StoreUnwritable`] when the record store write fails.
    pub fn apply_update(&self, patch: RecordPatch) -> Result<DatasetRecord, EngineError> {
        let patch = patch.validate()?;
        let _guard = self.lock_writes()?;
        let mut records = self.store.load_all().map_err(store_read_error)?;
        let now = self.clock.now();
        let position = patch.id.and_then(|id| records.iter().position(|record| record.id == id));
        let committed = match position.and_then(|index| records.get_mut(index)) {
            Some(record) => {
                let updated_at = advance_timestamp(now, record.updated_at);
                patch.merge_into(record, updated_at);
                record.clone()
            }
            None => {
                if let Some(requested) = patch.id {
                    warn!(
                        target: LOG_TARGET,
                        requested_id = %requested,
                        "update addressed an unknown id; creating a new record"
                    );
                }
                let id = next_id(&records)?;
                let record = patch.into_record(id, now)?;
                records.push(record.clone());
                record
            }
        };
        self.store.replace_all(&records).map_err(store_write_error)?;
        debug!(
            target: LOG_TARGET,
            id = %committed.id,
            updated_at = %committed.updated_at,
            "record committed to store"
        );
        self.propagate(&committed, &records);
        Ok(committed)
    }

    /// Rebuilds the index from the record store and marks it fresh.
    ///
    /// # Errors
    ///
    /// Returns a record store error when the collection cannot be read, or
    /// [`EngineError::IndexUnavailable`] when the rebuild fails.
    pub fn reconcile(&self) -> Result<usize, EngineError> {
        let _guard = self.lock_writes()?;
        let records = self.store.load_all().map_err(store_read_error)?;
        self.index.rebuild_from(&records).map_err(|err| {
            self.mark_stale(&err, "reconcile");
            EngineError::IndexUnavailable(err.to_string())
        })?;
        self.stale.store(false, Ordering::Release);
        info!(target: LOG_TARGET, records = records.len(), "search index reconciled");
        Ok(records.len())
    }

    /// Returns the current index freshness.
    #[must_use]
    pub fn freshness(&self) -> IndexFreshness {
        if self.stale.load(Ordering::Acquire) { IndexFreshness::Stale } else { IndexFreshness::Fresh }
    }

    /// Reports readiness of both stores.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        HealthReport {
            store_error: self.store.readiness().err().map(|err| err.to_string()),
            index_error: self.index.readiness().err().map(|err| err.to_string()),
            freshness: self.freshness(),
        }
    }

    /// Returns the read-only query facade.
    #[must_use]
    pub const fn query(&self) -> QueryFacade<'_, S, I, C> {
        QueryFacade::new(self)
    }

    /// Runs a read against the index, falling back to a record store scan.
    ///
    /// # Errors
    ///
    /// Returns a record store error only when the fallback scan fails.
    pub(crate) fn read<T>(
        &self,
        from_index: impl FnOnce(&I) -> Result<T, IndexError>,
        from_records: impl FnOnce(Vec<DatasetRecord>) -> T,
    ) -> Result<T, EngineError> {
        if self.stale.load(Ordering::Acquire) {
            self.reconcile_for_read();
        }
        if !self.stale.load(Ordering::Acquire) {
            match from_index(&self.index) {
                Ok(value) => return Ok(value),
                Err(err) => self.mark_stale(&err, "read"),
            }
        }
        let records = self.store.load_all().map_err(store_read_error)?;
        Ok(from_records(records))
    }

    /// Pushes a committed record into the index, rebuilding on failure.
    fn propagate(&self, record: &DatasetRecord, records: &[DatasetRecord]) {
        if self.stale.load(Ordering::Acquire) {
            self.rebuild_index(records);
            return;
        }
        if let Err(err) = self.index.upsert(record) {
            self.mark_stale(&err, "upsert");
            self.rebuild_index(records);
        }
    }

    /// Marks the index fresh when it already mirrors `records`, else rebuilds.
    fn sync_index(&self, records: &[DatasetRecord]) {
        let mut expected = records.to_vec();
        expected.sort_by_key(|record| record.id);
        match self.index.list_all() {
            Ok(indexed) if indexed == expected => {
                self.stale.store(false, Ordering::Release);
                debug!(target: LOG_TARGET, records = records.len(), "search index matches record store");
            }
            Ok(_) => self.rebuild_index(records),
            Err(err) => {
                self.mark_stale(&err, "open");
                self.rebuild_index(records);
            }
        }
    }

    /// Attempts one reconciliation on behalf of a reader.
    fn reconcile_for_read(&self) {
        let Ok(_guard) = self.lock_writes() else {
            return;
        };
        if !self.stale.load(Ordering::Acquire) {
            return;
        }
        match self.store.load_all() {
            Ok(records) => {
                self.rebuild_index(&records);
            }
            Err(err) => warn!(
                target: LOG_TARGET,
                error = %err,
                "stale index reconciliation skipped; record store unreadable"
            ),
        }
    }

    /// Rebuilds the index from `records`, clearing the stale flag on success.
    fn rebuild_index(&self, records: &[DatasetRecord]) {
        match self.index.rebuild_from(records) {
            Ok(()) => {
                if self.stale.swap(false, Ordering::AcqRel) {
                    info!(
                        target: LOG_TARGET,
                        records = records.len(),
                        "search index rebuilt from record store"
                    );
                }
            }
            Err(err) => self.mark_stale(&err, "rebuild"),
        }
    }

    /// Marks the index stale after a failed operation.
    fn mark_stale(&self, error: &IndexError, operation: &'static str) {
        self.stale.store(true, Ordering::Release);
        warn!(
            target: LOG_TARGET,
            operation,
            error = %error,
            "search index degraded; serving from record store until rebuilt"
        );
    }

    /// Acquires the collection-wide write lock across threads and processes.
    fn lock_writes(&self) -> Result<WriteGuard<'_>, EngineError> {
        let thread = self
            .write_lock
            .lock()
            .map_err(|_| EngineError::StoreUnwritable("write lock poisoned".to_string()))?;
        let process = self.store.lock_exclusive().map_err(store_lock_error)?;
        Ok(WriteGuard {
            _process: process,
            _thread: thread,
        })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncEngineConfig {
        &self.config
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the identifier for the next created record.
fn next_id(records: &[DatasetRecord]) -> Result<DatasetId, EngineError> {
    match records.iter().map(|record| record.id).max() {
        None => Ok(DatasetId::FIRST),
        Some(max) => max
            .next()
            .ok_or_else(|| EngineError::StoreUnwritable("dataset id space exhausted".to_string())),
    }
}

/// Returns `now` unless it would not advance past `previous`.
#[must_use]
pub fn advance_timestamp(now: Timestamp, previous: Timestamp) -> Timestamp {
    now.max(previous.successor())
}
