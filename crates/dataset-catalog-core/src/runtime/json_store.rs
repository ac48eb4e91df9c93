// crates/dataset-catalog-core/src/runtime/json_store.rs
// ============================================================================
// Module: JSON Record Store
// Description: Durable whole-document record store backed by one JSON file.
// Purpose: Persist the master record collection with atomic replace-on-write.
// Dependencies: crate::{core, interfaces}, fs2, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! The JSON record store keeps the entire collection in a single
//! pretty-printed document so operators can inspect and back it up with
//! ordinary tools. Every write is a full snapshot: the new document is written
//! to a uniquely named temporary file beside the destination, flushed to
//! disk, then renamed over the destination. Readers therefore observe either
//! the old document or the new one, never a mix.
//!
//! Document contents are untrusted on load: size, format version, and id
//! uniqueness are checked and any violation is reported as corruption.
//!
//! Loading never writes. Writers in any process serialize on an advisory
//! exclusive lock over a `<file>.lock` sibling of the document, so a
//! read-modify-write cycle in one process cannot overwrite another's commit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::core::DatasetRecord;
use crate::interfaces::RecordStore;
use crate::interfaces::StoreError;
use crate::interfaces::StoreLock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current on-disk document format version.
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;
/// Default maximum document size in bytes.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 64 * 1024 * 1024;
/// Number of temporary file names tried before a write gives up.
const TEMP_ATTEMPTS: usize = 16;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Tracing target for record store events.
const LOG_TARGET: &str = "dataset_catalog::store";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the JSON record store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `max_document_bytes` must be greater than zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStoreConfig {
    /// Path to the master document.
    pub path: PathBuf,
    /// Maximum accepted document size in bytes.
    pub max_document_bytes: usize,
}

impl JsonStoreConfig {
    /// Builds a config with the default size limit.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Document Format
// ============================================================================

/// Serialized form of the master document.
#[derive(Debug, Serialize)]
struct DocumentRef<'a> {
    /// Document format version.
    format_version: u32,
    /// Records in collection order.
    records: &'a [DatasetRecord],
}

/// Deserialized form of the master document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredDocument {
    /// Document format version.
    format_version: u32,
    /// Records in collection order.
    records: Vec<DatasetRecord>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Whole-document record store persisted as a single JSON file.
///
/// # Invariants
/// - The destination file is only ever replaced by rename.
/// - Writers hold [`RecordStore::lock_exclusive`] across load and replace.
#[derive(Debug)]
pub struct JsonRecordStore {
    /// Store configuration.
    config: JsonStoreConfig,
    /// Counter used to derive unique temporary file names.
    temp_counter: AtomicUsize,
}

impl JsonRecordStore {
    /// Creates a store for the configured document path.
    ///
    /// The document is not touched until it is initialized or written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the path or limits are invalid.
    pub fn new(config: JsonStoreConfig) -> Result<Self, StoreError> {
        validate_store_path(&config.path)?;
        if config.max_document_bytes == 0 {
            return Err(StoreError::Invalid(
                "max_document_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            temp_counter: AtomicUsize::new(0),
        })
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Returns the path of the lock file guarding writers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when the document path has no file name.
    pub fn lock_path(&self) -> Result<PathBuf, StoreError> {
        let file_name = document_file_name(self.path())?;
        Ok(self.path().with_file_name(format!("{file_name}.lock")))
    }

    /// Moves a corrupt document aside so the store can start empty.
    ///
    /// Returns the quarantine path, or `None` when no document exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the rename fails.
    pub fn quarantine(&self) -> Result<Option<PathBuf>, StoreError> {
        if !self.config.path.exists() {
            return Ok(None);
        }
        let file_name = document_file_name(&self.config.path)?;
        let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
        let target = self.config.path.with_file_name(format!("{file_name}.corrupt-{millis}"));
        fs::rename(&self.config.path, &target).map_err(|err| StoreError::Io(err.to_string()))?;
        warn!(
            target: LOG_TARGET,
            path = %self.config.path.display(),
            quarantined_to = %target.display(),
            "record store document quarantined"
        );
        Ok(Some(target))
    }

    /// Reads and parses the document; `None` when it does not exist.
    fn read_document(&self) -> Result<Option<Vec<DatasetRecord>>, StoreError> {
        let metadata = match fs::metadata(&self.config.path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.config.max_document_bytes {
            return Err(StoreError::Corrupt(format!(
                "document exceeds size limit: {size} bytes (max {})",
                self.config.max_document_bytes
            )));
        }
        let bytes = match fs::read(&self.config.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };
        let document: StoredDocument =
            serde_json::from_slice(&bytes).map_err(|err| StoreError::Corrupt(err.to_string()))?;
        if document.format_version != DOCUMENT_FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported document format version: {}",
                document.format_version
            )));
        }
        ensure_unique_ids(&document.records).map_err(StoreError::Corrupt)?;
        Ok(Some(document.records))
    }

    /// Writes `bytes` to a fresh temporary file and renames it into place.
    fn write_atomically(&self, bytes: &[u8]) -> Result<(), StoreError> {
        ensure_parent_dir(&self.config.path).map_err(StoreError::Unwritable)?;
        let (temp_path, mut file) = self.create_temp_file()?;
        let written = file.write_all(bytes).and_then(|()| file.sync_all());
        drop(file);
        if let Err(err) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Unwritable(err.to_string()));
        }
        if let Err(err) = fs::rename(&temp_path, &self.config.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Unwritable(err.to_string()));
        }
        sync_parent_dir(&self.config.path);
        Ok(())
    }

    /// Creates a uniquely named temporary file beside the document.
    ///
    /// Names follow `.<file>.tmp.<pid>.<n>` where `n` is taken from a
    /// per-store counter that starts at zero.
    fn create_temp_file(&self) -> Result<(PathBuf, fs::File), StoreError> {
        let file_name = document_file_name(&self.config.path)?;
        for _ in 0 .. TEMP_ATTEMPTS {
            let attempt = self.temp_counter.fetch_add(1, Ordering::Relaxed);
            let temp_name = format!(".{file_name}.tmp.{}.{attempt}", std::process::id());
            let temp_path = self.config.path.with_file_name(temp_name);
            match OpenOptions::new().write(true).create_new(true).open(&temp_path) {
                Ok(file) => return Ok((temp_path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
                Err(err) => return Err(StoreError::Unwritable(err.to_string())),
            }
        }
        Err(StoreError::Unwritable("failed to allocate temporary document path".to_string()))
    }
}

impl RecordStore for JsonRecordStore {
    fn load_all(&self) -> Result<Vec<DatasetRecord>, StoreError> {
        Ok(self.read_document()?.unwrap_or_default())
    }

    fn replace_all(&self, records: &[DatasetRecord]) -> Result<(), StoreError> {
        ensure_unique_ids(records).map_err(StoreError::Invalid)?;
        let document = DocumentRef {
            format_version: DOCUMENT_FORMAT_VERSION,
            records,
        };
        let mut bytes = serde_json::to_vec_pretty(&document)
            .map_err(|err| StoreError::Unwritable(err.to_string()))?;
        bytes.push(b'\n');
        if bytes.len() > self.config.max_document_bytes {
            return Err(StoreError::Unwritable(format!(
                "document exceeds size limit: {} bytes (max {})",
                bytes.len(),
                self.config.max_document_bytes
            )));
        }
        self.write_atomically(&bytes)
    }

    fn initialize(&self) -> Result<bool, StoreError> {
        match fs::symlink_metadata(&self.config.path) {
            Ok(_) => return Ok(false),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::Io(err.to_string())),
        }
        self.replace_all(&[])?;
        info!(target: LOG_TARGET, path = %self.config.path.display(), "initialized empty record store");
        Ok(true)
    }

    fn lock_exclusive(&self) -> Result<StoreLock, StoreError> {
        let lock_path = self.lock_path()?;
        ensure_parent_dir(&lock_path).map_err(StoreError::Io)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|err| {
                StoreError::Io(format!("failed to open lock file {}: {err}", lock_path.display()))
            })?;
        fs2::FileExt::lock_exclusive(&file).map_err(|err| {
            StoreError::Io(format!("failed to lock {}: {err}", lock_path.display()))
        })?;
        Ok(StoreLock::held(file))
    }

    fn readiness(&self) -> Result<(), StoreError> {
        if self.config.path.is_dir() {
            return Err(StoreError::Io("store path is a directory".to_string()));
        }
        match self.config.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                Err(StoreError::Io(format!("store directory missing: {}", parent.display())))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks that no identifier appears twice.
fn ensure_unique_ids(records: &[DatasetRecord]) -> Result<(), String> {
    let mut seen = BTreeSet::new();
    for record in records {
        if !seen.insert(record.id) {
            return Err(format!("duplicate dataset id {}", record.id));
        }
    }
    Ok(())
}

/// Creates the parent directory of `path` when it is missing.
fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| err.to_string())
        }
        _ => Ok(()),
    }
}

/// Returns the document file name as UTF-8.
fn document_file_name(path: &Path) -> Result<String, StoreError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Invalid("store path does not include a file name".to_string()))
}

/// Flushes the parent directory so the rename itself is durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    let dir = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

/// Directory sync is a no-op where directories cannot be opened as files.
#[cfg(not(unix))]
const fn sync_parent_dir(_path: &Path) {}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), StoreError> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(StoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(StoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(StoreError::Invalid("store path must be a file, not a directory".to_string()));
    }
    Ok(())
}
