// crates/dataset-catalog-core/src/core/identifiers.rs
// ============================================================================
// Module: Dataset Catalog Identifiers
// Description: Canonical opaque identifiers for dataset records.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Dataset identifiers are assigned by the sync engine at creation time and
//! never change afterwards. They serialize as plain numbers and enforce the
//! non-zero, 1-based invariant at construction boundaries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Dataset record identifier.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
/// - Unique across the whole collection in both the record store and the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(NonZeroU64);

impl DatasetId {
    /// The first identifier handed out for an empty collection.
    pub const FIRST: Self = Self(NonZeroU64::MIN);

    /// Creates a dataset identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Returns the identifier following this one, or `None` on overflow.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Error returned when a dataset identifier cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid dataset id: {0}")]
pub struct ParseDatasetIdError(String);

impl FromStr for DatasetId {
    type Err = ParseDatasetIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let raw: u64 =
            value.trim().parse().map_err(|_| ParseDatasetIdError(value.to_string()))?;
        Self::from_raw(raw).ok_or_else(|| ParseDatasetIdError(value.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
