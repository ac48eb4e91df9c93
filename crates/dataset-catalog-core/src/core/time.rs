// crates/dataset-catalog-core/src/core/time.rs
// ============================================================================
// Module: Dataset Catalog Time Model
// Description: Canonical timestamp representation for record lifecycle fields.
// Purpose: Keep record timestamps explicit, comparable, and replayable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Record timestamps are unix-epoch milliseconds. The engine never reads the
//! wall clock directly; it asks a [`crate::interfaces::Clock`] so hosts and
//! tests control time explicitly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used for `created_at` and `updated_at`.
///
/// # Invariants
/// - Value is unix epoch milliseconds.
/// - Ordering is numeric; callers are responsible for monotonicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the smallest timestamp strictly after `self`.
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
