// crates/dataset-catalog-cli/src/output.rs
// ============================================================================
// Module: CLI Output Views
// Description: Serializable shapes printed by the CLI.
// Purpose: Keep stdout JSON stable and independent of internal types.
// Dependencies: dataset-catalog-core, serde, time
// ============================================================================

//! ## Overview
//! Records are printed exactly as stored. Aggregate views add RFC 3339
//! renderings of millisecond timestamps for human readers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use dataset_catalog_core::CatalogStats;
use dataset_catalog_core::HealthReport;
use dataset_catalog_core::IndexFreshness;
use dataset_catalog_core::Timestamp;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Views
// ============================================================================

/// Output of the `stats` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsView {
    /// Number of records.
    pub count: usize,
    /// Most recent update in unix milliseconds.
    pub last_updated: Option<Timestamp>,
    /// Most recent update as RFC 3339.
    pub last_updated_rfc3339: Option<String>,
    /// Records per tag.
    pub tag_counts: BTreeMap<String, usize>,
}

impl From<CatalogStats> for StatsView {
    fn from(stats: CatalogStats) -> Self {
        Self {
            count: stats.count,
            last_updated_rfc3339: stats.last_updated.and_then(rfc3339),
            last_updated: stats.last_updated,
            tag_counts: stats.tag_counts,
        }
    }
}

/// Output of the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    /// True when the record store is usable.
    pub healthy: bool,
    /// Index freshness at the time of the probe.
    pub freshness: IndexFreshness,
    /// Record store readiness failure, if any.
    pub store_error: Option<String>,
    /// Search index readiness failure, if any.
    pub index_error: Option<String>,
}

impl From<HealthReport> for StatusView {
    fn from(report: HealthReport) -> Self {
        Self {
            healthy: report.is_healthy(),
            freshness: report.freshness,
            store_error: report.store_error,
            index_error: report.index_error,
        }
    }
}

/// Output of the `reindex` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReindexView {
    /// Number of records written to the index.
    pub indexed: usize,
    /// Index freshness after the rebuild.
    pub freshness: IndexFreshness,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a millisecond timestamp as RFC 3339, `None` when out of range.
#[must_use]
pub fn rfc3339(timestamp: Timestamp) -> Option<String> {
    let nanos = i128::from(timestamp.as_unix_millis()).checked_mul(1_000_000)?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?.format(&Rfc3339).ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
