// crates/dataset-catalog-core/src/core/record.rs
// ============================================================================
// Module: Dataset Records
// Description: The dataset metadata record held by both stores.
// Purpose: Define the single entity shared by the record store and the index.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`DatasetRecord`] describes one externally hosted cleaned dataset file.
//! The file itself lives elsewhere; `drive_url` is an opaque pointer that the
//! catalog never dereferences.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DatasetId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Metadata record for one cleaned dataset file.
///
/// # Invariants
/// - `id` never changes after creation.
/// - `created_at <= updated_at`.
/// - `tags` holds no duplicates and preserves first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Stable record identifier.
    pub id: DatasetId,
    /// Human-readable dataset name.
    pub name: String,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Location of the cleaned file on the remote host.
    pub drive_url: String,
    /// Optional row count of the cleaned file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    /// Optional column names of the cleaned file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Search tags in first-seen order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last successful write time.
    pub updated_at: Timestamp,
}

/// Aggregate statistics over the record collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Number of records in the collection.
    pub count: usize,
    /// Most recent `updated_at` across the collection.
    pub last_updated: Option<Timestamp>,
    /// Number of records carrying each tag.
    pub tag_counts: std::collections::BTreeMap<String, usize>,
}

impl CatalogStats {
    /// Computes statistics for the provided records.
    #[must_use]
    pub fn from_records(records: &[DatasetRecord]) -> Self {
        let mut tag_counts = std::collections::BTreeMap::new();
        for tag in records.iter().flat_map(|record| record.tags.iter()) {
            *tag_counts.entry(tag.clone()).or_insert(0) += 1;
        }
        Self {
            count: records.len(),
            last_updated: records.iter().map(|record| record.updated_at).max(),
            tag_counts,
        }
    }
}
