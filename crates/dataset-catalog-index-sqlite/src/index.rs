// crates/dataset-catalog-index-sqlite/src/index.rs
// ============================================================================
// Module: SQLite Search Index
// Description: Rebuildable SearchIndex backed by SQLite WAL.
// Purpose: Answer ranked, recency, and id lookups without scanning the store.
// Dependencies: dataset-catalog-core, rusqlite, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! This module implements [`SearchIndex`] over one `datasets` table. Each row
//! carries the record fields plus case-folded copies of the searchable text,
//! folded in Rust with [`search::fold`] so matching agrees with the record
//! store scan for every script, not only ASCII.
//!
//! Connections are opened lazily and dropped after any failure, so a missing,
//! locked, or replaced database file heals on the next call instead of
//! poisoning the process. Rebuilds run in a single transaction: readers see
//! the old contents or the new ones, never a half-populated table.
//!
//! Security posture: database contents are untrusted; every row is validated on decode.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dataset_catalog_core::DatasetId;
use dataset_catalog_core::DatasetRecord;
use dataset_catalog_core::IndexError;
use dataset_catalog_core::SearchIndex;
use dataset_catalog_core::SearchQuery;
use dataset_catalog_core::Timestamp;
use dataset_catalog_core::core::search;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the index.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read connections.
const DEFAULT_READ_POOL_SIZE: usize = 2;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Tracing target for index events.
const LOG_TARGET: &str = "dataset_catalog::index";

/// Columns selected for every record read, in [`RawRow`] order.
const RECORD_COLUMNS: &str =
    "id, name, description, drive_url, row_count, columns_json, tags_json, created_at, updated_at";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// The index is rebuildable, so `normal` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    Full,
    /// Normal synchronous mode.
    #[default]
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` search index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteIndexConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of pooled read connections.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteIndexConfig {
    /// Builds a config with default tuning for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
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
// SECTION: Errors
// ============================================================================

/// `SQLite` index errors.
#[derive(Debug, Error)]
pub enum SqliteIndexError {
    /// Filesystem error around the database file.
    #[error("sqlite index io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite index db error: {0}")]
    Db(String),
    /// Stored row cannot be decoded.
    #[error("sqlite index corruption: {0}")]
    Corrupt(String),
    /// Invalid configuration or record.
    #[error("sqlite index invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteIndexError> for IndexError {
    fn from(error: SqliteIndexError) -> Self {
        match error {
            SqliteIndexError::Io(message) | SqliteIndexError::Db(message) => {
                Self::Unavailable(message)
            }
            SqliteIndexError::Corrupt(message) | SqliteIndexError::Invalid(message) => {
                Self::Corrupt(message)
            }
        }
    }
}

/// Maps a `rusqlite` error into an index error.
fn db_error(error: rusqlite::Error) -> SqliteIndexError {
    SqliteIndexError::Db(error.to_string())
}

// ============================================================================
// SECTION: Index
// ============================================================================

/// Lazily opened connection slot.
type ConnectionSlot = Mutex<Option<Connection>>;

/// `SQLite`-backed search index with a pooled set of read connections.
///
/// # Invariants
/// - Every write goes through `write_connection`.
/// - A slot whose last operation failed holds `None` and reopens on next use.
pub struct SqliteSearchIndex {
    /// Index configuration.
    config: SqliteIndexConfig,
    /// Connection used for upserts and rebuilds.
    write_connection: ConnectionSlot,
    /// Connections used for reads.
    read_connections: Vec<ConnectionSlot>,
    /// Round-robin cursor over `read_connections`.
    read_cursor: AtomicUsize,
}

impl SqliteSearchIndex {
    /// Creates an index for the configured database path.
    ///
    /// No connection is opened here; an unreachable database only degrades
    /// later calls.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteIndexError::Invalid`] when the configuration is invalid.
    pub fn new(config: SqliteIndexConfig) -> Result<Self, SqliteIndexError> {
        validate_index_path(&config.path)?;
        if config.read_pool_size == 0 {
            return Err(SqliteIndexError::Invalid(
                "read_pool_size must be greater than zero".to_string(),
            ));
        }
        let read_connections = (0 .. config.read_pool_size).map(|_| Mutex::new(None)).collect();
        Ok(Self {
            config,
            write_connection: Mutex::new(None),
            read_connections,
            read_cursor: AtomicUsize::new(0),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Returns the next read connection slot using round-robin selection.
    fn read_slot(&self) -> &ConnectionSlot {
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.read_connections.len();
        self.read_connections.get(index).unwrap_or(&self.write_connection)
    }

    /// Runs `operation` on the connection in `slot`, opening it if needed.
    fn with_connection<T>(
        &self,
        slot: &ConnectionSlot,
        operation: impl FnOnce(&mut Connection) -> Result<T, SqliteIndexError>,
    ) -> Result<T, SqliteIndexError> {
        let mut guard =
            slot.lock().map_err(|_| SqliteIndexError::Db("sqlite mutex poisoned".to_string()))?;
        let connection = match guard.take() {
            Some(connection) => connection,
            None => open_connection(&self.config).inspect_err(|err| {
                warn!(
                    target: LOG_TARGET,
                    path = %self.config.path.display(),
                    error = %err,
                    "sqlite index connection failed"
                );
            })?,
        };
        let connection = guard.insert(connection);
        let result = operation(connection);
        if result.is_err() {
            *guard = None;
        }
        result
    }

    /// Runs a read-only record query on a pooled read connection.
    fn read_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DatasetRecord>, SqliteIndexError> {
        self.with_connection(self.read_slot(), |connection| {
            let mut statement = connection.prepare_cached(sql).map_err(db_error)?;
            let rows = statement.query_map(params, RawRow::from_row).map_err(db_error)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(db_error)?.into_record()?);
            }
            Ok(records)
        })
    }
}

impl SearchIndex for SqliteSearchIndex {
    fn upsert(&self, record: &DatasetRecord) -> Result<(), IndexError> {
        let row = IndexedRow::from_record(record)?;
        self.with_connection(&self.write_connection, |connection| {
            row.upsert(connection)?;
            Ok(())
        })
        .map_err(IndexError::from)
    }

    fn get_by_id(&self, id: DatasetId) -> Result<Option<DatasetRecord>, IndexError> {
        let raw_id = i64::try_from(id.get())
            .map_err(|_| SqliteIndexError::Invalid(format!("dataset id out of range: {id}")))?;
        self.with_connection(self.read_slot(), |connection| {
            let raw = connection
                .query_row(
                    &format!("SELECT {RECORD_COLUMNS} FROM datasets WHERE id = ?1"),
                    params![raw_id],
                    RawRow::from_row,
                )
                .optional()
                .map_err(db_error)?;
            raw.map(RawRow::into_record).transpose()
        })
        .map_err(IndexError::from)
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<DatasetRecord>, IndexError> {
        let limit = sql_limit(query.limit());
        let records = if query.is_match_all() {
            self.read_records(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM datasets ORDER BY updated_at DESC, id ASC LIMIT \
                     ?1"
                ),
                params![limit],
            )
        } else {
            self.read_records(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM (
                        SELECT *,
                            (CASE WHEN instr(name_fold, ?1) > 0 THEN ?2 ELSE 0 END)
                            + (CASE WHEN instr(tags_fold, ?1) > 0 THEN ?3 ELSE 0 END)
                            + (CASE WHEN instr(description_fold, ?1) > 0 THEN ?4 ELSE 0 END)
                            AS score
                        FROM datasets
                    )
                    WHERE score > 0
                    ORDER BY score DESC, updated_at DESC, id ASC
                    LIMIT ?5"
                ),
                params![
                    query.text(),
                    search::NAME_WEIGHT,
                    search::TAG_WEIGHT,
                    search::DESCRIPTION_WEIGHT,
                    limit
                ],
            )
        };
        records.map_err(IndexError::from)
    }

    fn latest(&self, count: usize) -> Result<Vec<DatasetRecord>, IndexError> {
        self.read_records(
            &format!("SELECT {RECORD_COLUMNS} FROM datasets ORDER BY updated_at DESC, id ASC LIMIT ?1"),
            params![sql_limit(count)],
        )
        .map_err(IndexError::from)
    }

    fn list_all(&self) -> Result<Vec<DatasetRecord>, IndexError> {
        self.read_records(&format!("SELECT {RECORD_COLUMNS} FROM datasets ORDER BY id ASC"), [])
            .map_err(IndexError::from)
    }

    fn rebuild_from(&self, records: &[DatasetRecord]) -> Result<(), IndexError> {
        let rows = records.iter().map(IndexedRow::from_record).collect::<Result<Vec<_>, _>>()?;
        self.with_connection(&self.write_connection, |connection| {
            let tx = connection.transaction().map_err(db_error)?;
            tx.execute("DELETE FROM datasets", []).map_err(db_error)?;
            for row in &rows {
                row.upsert(&tx)?;
            }
            tx.commit().map_err(db_error)
        })?;
        info!(
            target: LOG_TARGET,
            path = %self.config.path.display(),
            records = rows.len(),
            "sqlite index rebuilt"
        );
        Ok(())
    }

    fn readiness(&self) -> Result<(), IndexError> {
        self.with_connection(&self.write_connection, |connection| {
            connection.query_row("SELECT 1", [], |_| Ok(())).map_err(db_error)
        })
        .map_err(IndexError::from)
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Record encoded for insertion, including folded search columns.
struct IndexedRow<'a> {
    /// Source record.
    record: &'a DatasetRecord,
    /// Record id as stored.
    id: i64,
    /// Row count as stored.
    rows: Option<i64>,
    /// Column names as JSON.
    columns_json: Option<String>,
    /// Tags as JSON.
    tags_json: String,
    /// Folded name.
    name_fold: String,
    /// Folded description.
    description_fold: String,
    /// Folded tags joined by the tag separator.
    tags_fold: String,
}

impl<'a> IndexedRow<'a> {
    /// Encodes a record for storage.
    fn from_record(record: &'a DatasetRecord) -> Result<Self, SqliteIndexError> {
        let id = i64::try_from(record.id.get())
            .map_err(|_| SqliteIndexError::Invalid(format!("dataset id out of range: {}", record.id)))?;
        let rows = record
            .rows
            .map(i64::try_from)
            .transpose()
            .map_err(|_| SqliteIndexError::Invalid(format!("rows out of range for {}", record.id)))?;
        let columns_json = record
            .columns
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| SqliteIndexError::Invalid(err.to_string()))?;
        let tags_json = serde_json::to_string(&record.tags)
            .map_err(|err| SqliteIndexError::Invalid(err.to_string()))?;
        Ok(Self {
            record,
            id,
            rows,
            columns_json,
            tags_json,
            name_fold: search::fold(&record.name),
            description_fold: record.description.as_deref().map(search::fold).unwrap_or_default(),
            tags_fold: search::fold_tags(&record.tags),
        })
    }

    /// Inserts or replaces this row.
    fn upsert(&self, connection: &Connection) -> Result<(), SqliteIndexError> {
        connection
            .prepare_cached(
                "INSERT INTO datasets (id, name, description, drive_url, row_count, columns_json, \
                 tags_json, created_at, updated_at, name_fold, description_fold, tags_fold) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = \
                 excluded.description, drive_url = excluded.drive_url, row_count = excluded.row_count, \
                 columns_json = excluded.columns_json, tags_json = excluded.tags_json, \
                 created_at = excluded.created_at, updated_at = excluded.updated_at, name_fold = \
                 excluded.name_fold, description_fold = excluded.description_fold, tags_fold = \
                 excluded.tags_fold",
            )
            .and_then(|mut statement| {
                statement.execute(params![
                    self.id,
                    self.record.name,
                    self.record.description,
                    self.record.drive_url,
                    self.rows,
                    self.columns_json,
                    self.tags_json,
                    self.record.created_at.as_unix_millis(),
                    self.record.updated_at.as_unix_millis(),
                    self.name_fold,
                    self.description_fold,
                    self.tags_fold,
                ])
            })
            .map_err(db_error)?;
        Ok(())
    }
}

/// Row as read back from `SQLite`, before validation.
struct RawRow {
    /// Stored id.
    id: i64,
    /// Stored name.
    name: String,
    /// Stored description.
    description: Option<String>,
    /// Stored drive URL.
    drive_url: String,
    /// Stored row count.
    rows: Option<i64>,
    /// Stored column names JSON.
    columns_json: Option<String>,
    /// Stored tags JSON.
    tags_json: String,
    /// Stored creation time.
    created_at: i64,
    /// Stored update time.
    updated_at: i64,
}

impl RawRow {
    /// Reads the columns listed in [`RECORD_COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            drive_url: row.get(3)?,
            rows: row.get(4)?,
            columns_json: row.get(5)?,
            tags_json: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Validates and decodes the stored row.
    fn into_record(self) -> Result<DatasetRecord, SqliteIndexError> {
        let id = u64::try_from(self.id)
            .ok()
            .and_then(DatasetId::from_raw)
            .ok_or_else(|| SqliteIndexError::Corrupt(format!("invalid dataset id {}", self.id)))?;
        let rows = self
            .rows
            .map(u64::try_from)
            .transpose()
            .map_err(|_| SqliteIndexError::Corrupt(format!("negative row count for {id}")))?;
        let columns = self
            .columns_json
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()
            .map_err(|err| SqliteIndexError::Corrupt(format!("columns for {id}: {err}")))?;
        let tags = serde_json::from_str::<Vec<String>>(&self.tags_json)
            .map_err(|err| SqliteIndexError::Corrupt(format!("tags for {id}: {err}")))?;
        Ok(DatasetRecord {
            id,
            name: self.name,
            description: self.description,
            drive_url: self.drive_url,
            rows,
            columns,
            tags,
            created_at: Timestamp::from_unix_millis(self.created_at),
            updated_at: Timestamp::from_unix_millis(self.updated_at),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a result count into an SQL `LIMIT` value.
fn sql_limit(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Validates index paths for safety limits.
fn validate_index_path(path: &Path) -> Result<(), SqliteIndexError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteIndexError::Invalid("index path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteIndexError::Invalid("index path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteIndexError::Invalid(
                "index path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteIndexError::Invalid(
            "index path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Ensures the parent directory for the database exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteIndexError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|err| SqliteIndexError::Io(err.to_string()))
        }
        _ => Ok(()),
    }
}

/// Opens a configured connection with an initialized schema.
fn open_connection(config: &SqliteIndexConfig) -> Result<Connection, SqliteIndexError> {
    ensure_parent_dir(&config.path)?;
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let mut connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    initialize_schema(&mut connection)?;
    Ok(connection)
}

/// Applies journal, sync, and busy-timeout settings.
fn apply_pragmas(connection: &Connection, config: &SqliteIndexConfig) -> Result<(), SqliteIndexError> {
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    Ok(())
}

/// Creates the schema, or recreates it when the stored version differs.
///
/// The index holds nothing that cannot be rebuilt, so an unknown schema is
/// dropped rather than migrated.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteIndexError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    if version != Some(SCHEMA_VERSION) {
        if let Some(found) = version {
            warn!(
                target: LOG_TARGET,
                found,
                expected = SCHEMA_VERSION,
                "sqlite index schema version changed; recreating empty index"
            );
        }
        tx.execute_batch(
            "DROP TABLE IF EXISTS datasets;
            DELETE FROM store_meta;",
        )
        .map_err(db_error)?;
        tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
            .map_err(db_error)?;
    }
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS datasets (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            drive_url TEXT NOT NULL,
            row_count INTEGER,
            columns_json TEXT,
            tags_json TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            name_fold TEXT NOT NULL,
            description_fold TEXT NOT NULL,
            tags_fold TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_datasets_updated_at
            ON datasets (updated_at DESC, id ASC);",
    )
    .map_err(db_error)?;
    tx.commit().map_err(db_error)
}
