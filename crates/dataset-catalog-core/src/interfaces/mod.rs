// crates/dataset-catalog-core/src/interfaces/mod.rs
// ============================================================================
// Module: Dataset Catalog Interfaces
// Description: Backend-agnostic interfaces for the record store, index, and clock.
// Purpose: Define the contract surfaces the sync engine is built against.
// Dependencies: crate::core, fs2
// ============================================================================

//! ## Overview
//! The sync engine talks to storage only through these traits. The record
//! store is the durable source of truth; the search index is a disposable,
//! rebuildable projection. Implementations must never partially apply a
//! write and must report failures instead of silently dropping them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use thiserror::Error;

use crate::core::DatasetId;
use crate::core::DatasetRecord;
use crate::core::SearchQuery;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Record Store
// ============================================================================

/// Record store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - A failed write leaves the previously committed document intact.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The persisted document cannot be parsed or violates collection invariants.
    #[error("record store corruption: {0}")]
    Corrupt(String),
    /// The document could not be written; prior state is intact.
    #[error("record store unwritable: {0}")]
    Unwritable(String),
    /// The document could not be read.
    #[error("record store io error: {0}")]
    Io(String),
    /// The collection handed to the store is invalid.
    #[error("record store invalid data: {0}")]
    Invalid(String),
}

/// Exclusive cross-process lock on a record store, released on drop.
#[derive(Debug, Default)]
pub struct StoreLock {
    /// Locked file handle; `None` when the store needs no process lock.
    file: Option<File>,
}

impl StoreLock {
    /// Wraps a file handle that already holds an exclusive lock.
    #[must_use]
    pub fn held(file: File) -> Self {
        Self {
            file: Some(file),
        }
    }

    /// Returns true when a file lock is held.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
        }
    }
}

/// Durable whole-document store for the full record collection.
pub trait RecordStore {
    /// Loads the whole collection in stored order.
    ///
    /// A missing document is an empty collection; loading never writes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] when the document cannot be parsed.
    fn load_all(&self) -> Result<Vec<DatasetRecord>, StoreError>;

    /// Atomically replaces the whole collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unwritable`] on I/O failure; the previous
    /// document remains readable.
    fn replace_all(&self, records: &[DatasetRecord]) -> Result<(), StoreError>;

    /// Writes an empty collection when no document exists yet.
    ///
    /// Returns true when a document was created. Callers hold
    /// [`RecordStore::lock_exclusive`] while initializing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document cannot be checked or written.
    fn initialize(&self) -> Result<bool, StoreError> {
        Ok(false)
    }

    /// Blocks until this process holds the store's exclusive write lock.
    ///
    /// Every read-modify-write cycle runs under this lock so writers in
    /// separate processes never interleave.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the lock cannot be acquired.
    fn lock_exclusive(&self) -> Result<StoreLock, StoreError> {
        Ok(StoreLock::default())
    }

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Search Index
// ============================================================================

/// Search index errors.
///
/// # Invariants
/// - Index errors never threaten the record store and are recoverable by rebuild.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// Index storage cannot be opened or queried.
    #[error("search index unavailable: {0}")]
    Unavailable(String),
    /// Index contents cannot be decoded.
    #[error("search index corruption: {0}")]
    Corrupt(String),
}

/// Queryable, rebuildable projection of the record collection.
pub trait SearchIndex {
    /// Inserts or replaces the row keyed by `record.id`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the index cannot be written.
    fn upsert(&self, record: &DatasetRecord) -> Result<(), IndexError>;

    /// Looks up one record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the index cannot be read.
    fn get_by_id(&self, id: DatasetId) -> Result<Option<DatasetRecord>, IndexError>;

    /// Returns records matching the query in ranked order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the index cannot be read.
    fn search(&self, query: &SearchQuery) -> Result<Vec<DatasetRecord>, IndexError>;

    /// Returns the `count` most recently updated records.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the index cannot be read.
    fn latest(&self, count: usize) -> Result<Vec<DatasetRecord>, IndexError>;

    /// Returns every record in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the index cannot be read.
    fn list_all(&self) -> Result<Vec<DatasetRecord>, IndexError>;

    /// Drops and repopulates the whole index from `records`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the rebuild fails; the index may then be
    /// left in its previous state but never half-populated.
    fn rebuild_from(&self, records: &[DatasetRecord]) -> Result<(), IndexError>;

    /// Reports index readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the index is unavailable.
    fn readiness(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of record timestamps.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
        Timestamp::from_unix_millis(millis)
    }
}

// ============================================================================
// SECTION: Shared References
// ============================================================================

impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    fn load_all(&self) -> Result<Vec<DatasetRecord>, StoreError> {
        (**self).load_all()
    }

    fn replace_all(&self, records: &[DatasetRecord]) -> Result<(), StoreError> {
        (**self).replace_all(records)
    }

    fn initialize(&self) -> Result<bool, StoreError> {
        (**self).initialize()
    }

    fn lock_exclusive(&self) -> Result<StoreLock, StoreError> {
        (**self).lock_exclusive()
    }

    fn readiness(&self) -> Result<(), StoreError> {
        (**self).readiness()
    }
}

impl<T: SearchIndex + ?Sized> SearchIndex for std::sync::Arc<T> {
    fn upsert(&self, record: &DatasetRecord) -> Result<(), IndexError> {
        (**self).upsert(record)
    }

    fn get_by_id(&self, id: DatasetId) -> Result<Option<DatasetRecord>, IndexError> {
        (**self).get_by_id(id)
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<DatasetRecord>, IndexError> {
        (**self).search(query)
    }

    fn latest(&self, count: usize) -> Result<Vec<DatasetRecord>, IndexError> {
        (**self).latest(count)
    }

    fn list_all(&self) -> Result<Vec<DatasetRecord>, IndexError> {
        (**self).list_all()
    }

    fn rebuild_from(&self, records: &[DatasetRecord]) -> Result<(), IndexError> {
        (**self).rebuild_from(records)
    }

    fn readiness(&self) -> Result<(), IndexError> {
        (**self).readiness()
    }
}

impl<T: SearchIndex + ?Sized> SearchIndex for Box<T> {
    fn upsert(&self, record: &DatasetRecord) -> Result<(), IndexError> {
        (**self).upsert(record)
    }

    fn get_by_id(&self, id: DatasetId) -> Result<Option<DatasetRecord>, IndexError> {
        (**self).get_by_id(id)
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<DatasetRecord>, IndexError> {
        (**self).search(query)
    }

    fn latest(&self, count: usize) -> Result<Vec<DatasetRecord>, IndexError> {
        (**self).latest(count)
    }

    fn list_all(&self) -> Result<Vec<DatasetRecord>, IndexError> {
        (**self).list_all()
    }

    fn rebuild_from(&self, records: &[DatasetRecord]) -> Result<(), IndexError> {
        (**self).rebuild_from(records)
    }

    fn readiness(&self) -> Result<(), IndexError> {
        (**self).readiness()
    }
}
