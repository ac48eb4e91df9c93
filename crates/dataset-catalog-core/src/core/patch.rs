// crates/dataset-catalog-core/src/core/patch.rs
// ============================================================================
// Module: Record Patches
// Description: Optional-field update payloads and their validation rules.
// Purpose: Validate and normalize writes before any store is touched.
// Dependencies: serde, thiserror, url
// ============================================================================

//! ## Overview
//! A [`RecordPatch`] is the only write payload accepted by the sync engine.
//! Every field is optional; an absent field leaves the stored value
//! unchanged. Creation requires `name` and `drive_url`.
//!
//! Patches are untrusted input. [`RecordPatch::validate`] enforces field
//! limits and normalizes values (trimmed names, de-duplicated tags) so both
//! stores always see the same canonical form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::core::identifiers::DatasetId;
use crate::core::record::DatasetRecord;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum dataset name length in characters.
pub const MAX_NAME_CHARS: usize = 256;
/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 4_096;
/// Maximum drive URL length in bytes.
pub const MAX_URL_BYTES: usize = 2_048;
/// Maximum number of tags per record.
pub const MAX_TAGS: usize = 64;
/// Maximum tag length in characters.
pub const MAX_TAG_CHARS: usize = 64;
/// Maximum number of column names per record.
pub const MAX_COLUMNS: usize = 4_096;
/// Maximum column name length in characters.
pub const MAX_COLUMN_CHARS: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rejection of a malformed write payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid record patch: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Builds a validation error from a message.
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// ============================================================================
// SECTION: Patch
// ============================================================================

/// Partial or full record update.
///
/// # Invariants
/// - `None` means "leave unchanged" for updates and "unset" for creation.
/// - `id` addresses an existing record; it never chooses a new identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordPatch {
    /// Identifier of the record to update.
    #[serde(default)]
    pub id: Option<DatasetId>,
    /// New dataset name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New drive URL.
    #[serde(default)]
    pub drive_url: Option<String>,
    /// New row count.
    #[serde(default)]
    pub rows: Option<u64>,
    /// New column list (replaces the stored list).
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    /// New tag list (replaces the stored list).
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RecordPatch {
    /// Validates field limits and returns the normalized patch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when any present field is malformed.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let name = self.name.map(|name| normalize_name(&name)).transpose()?;
        let description = self.description.map(validate_description).transpose()?;
        let drive_url = self.drive_url.map(|url| validate_drive_url(&url)).transpose()?;
        if let Some(rows) = self.rows
            && i64::try_from(rows).is_err()
        {
            return Err(ValidationError::new(format!("rows out of range: {rows}")));
        }
        let columns = self.columns.map(validate_columns).transpose()?;
        let tags = self.tags.map(normalize_tags).transpose()?;
        Ok(Self {
            id: self.id,
            name,
            description,
            drive_url,
            rows: self.rows,
            columns,
            tags,
        })
    }

    /// Returns true when the patch changes no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.drive_url.is_none()
            && self.rows.is_none()
            && self.columns.is_none()
            && self.tags.is_none()
    }

    /// Builds a new record from a validated patch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `name` or `drive_url` is missing.
    pub fn into_record(self, id: DatasetId, now: Timestamp) -> Result<DatasetRecord, ValidationError> {
        let name = self.name.ok_or_else(|| ValidationError::new("name is required on create"))?;
        let drive_url = self
            .drive_url
            .ok_or_else(|| ValidationError::new("drive_url is required on create"))?;
        Ok(DatasetRecord {
            id,
            name,
            description: self.description,
            drive_url,
            rows: self.rows,
            columns: self.columns,
            tags: self.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Merges a validated patch into an existing record.
    ///
    /// `updated_at` is set to `now`; `id` and `created_at` are preserved.
    pub fn merge_into(self, record: &mut DatasetRecord, now: Timestamp) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(description) = self.description {
            record.description = Some(description);
        }
        if let Some(drive_url) = self.drive_url {
            record.drive_url = drive_url;
        }
        if let Some(rows) = self.rows {
            record.rows = Some(rows);
        }
        if let Some(columns) = self.columns {
            record.columns = Some(columns);
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
        record.updated_at = now;
    }
}

// ============================================================================
// SECTION: Field Rules
// ============================================================================

/// Trims and checks a dataset name.
fn normalize_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("name must be non-empty"));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::new(format!("name exceeds {MAX_NAME_CHARS} characters")));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::new("name must not contain control characters"));
    }
    Ok(trimmed.to_string())
}

/// Checks the description length.
fn validate_description(description: String) -> Result<String, ValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ValidationError::new(format!(
            "description exceeds {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(description)
}

/// Checks that the drive URL is an absolute http(s) URL.
fn validate_drive_url(url: &str) -> Result<String, ValidationError> {
    let trimmed = url.trim();
    if trimmed.len() > MAX_URL_BYTES {
        return Err(ValidationError::new(format!("drive_url exceeds {MAX_URL_BYTES} bytes")));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| ValidationError::new(format!("drive_url is not a valid url: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::new("drive_url must use http or https"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::new("drive_url must include a host"));
    }
    Ok(trimmed.to_string())
}

/// Checks the column list.
fn validate_columns(columns: Vec<String>) -> Result<Vec<String>, ValidationError> {
    if columns.len() > MAX_COLUMNS {
        return Err(ValidationError::new(format!("more than {MAX_COLUMNS} columns")));
    }
    for column in &columns {
        if column.is_empty() || column.chars().count() > MAX_COLUMN_CHARS {
            return Err(ValidationError::new(format!(
                "column names must be 1..={MAX_COLUMN_CHARS} characters"
            )));
        }
    }
    Ok(columns)
}

/// Trims, checks, and de-duplicates tags preserving first-seen order.
fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, ValidationError> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_TAG_CHARS {
            return Err(ValidationError::new(format!(
                "tags must be 1..={MAX_TAG_CHARS} characters"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(ValidationError::new("tags must not contain control characters"));
        }
        if !normalized.iter().any(|existing| existing == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    if normalized.len() > MAX_TAGS {
        return Err(ValidationError::new(format!("more than {MAX_TAGS} tags")));
    }
    Ok(normalized)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
