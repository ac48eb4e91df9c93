// crates/dataset-catalog-core/src/core/search.rs
// ============================================================================
// Module: Search Ranking
// Description: Query normalization, relevance scoring, and result ordering.
// Purpose: Single definition of search semantics shared by every read path.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Search is a case-insensitive substring match of the query against a
//! record's name, tags, and description. Relevance is the sum of
//! [`NAME_WEIGHT`], [`TAG_WEIGHT`], and [`DESCRIPTION_WEIGHT`] for the fields
//! that match. Results order by relevance descending, then `updated_at`
//! descending, then `id` ascending.
//!
//! An empty query matches every record with relevance zero, so the result is
//! simply the most recently updated records.
//!
//! The in-memory index and the record store fallback scan call [`rank`]
//! directly. The `SQLite` index expresses the same rules in SQL over columns
//! folded with [`fold`] and [`fold_tags`]; the two must stay in lockstep.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use crate::core::patch::ValidationError;
use crate::core::record::DatasetRecord;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Relevance contributed by a name match.
pub const NAME_WEIGHT: i64 = 4;
/// Relevance contributed by a match in any tag.
pub const TAG_WEIGHT: i64 = 2;
/// Relevance contributed by a description match.
pub const DESCRIPTION_WEIGHT: i64 = 1;
/// Separator used when tags are folded into a single searchable column.
///
/// Tags and queries never contain control characters, so a match can never
/// straddle two tags.
pub const TAG_SEPARATOR: char = '\u{1f}';
/// Maximum query length in characters.
pub const MAX_QUERY_CHARS: usize = 256;

// ============================================================================
// SECTION: Query
// ============================================================================

/// Normalized search request.
///
/// # Invariants
/// - `text` is trimmed, lowercase, and free of control characters.
/// - `limit >= 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Folded query text.
    text: String,
    /// Maximum number of results.
    limit: usize,
}

impl SearchQuery {
    /// Builds a normalized query.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `limit` is zero or the text is too long.
    pub fn new(text: &str, limit: usize) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError("search limit must be greater than zero".to_string()));
        }
        let stripped: String = text.chars().filter(|ch| !ch.is_control()).collect();
        let trimmed = stripped.trim();
        if trimmed.chars().count() > MAX_QUERY_CHARS {
            return Err(ValidationError(format!(
                "search query exceeds {MAX_QUERY_CHARS} characters"
            )));
        }
        Ok(Self {
            text: fold(trimmed),
            limit,
        })
    }

    /// Returns the folded query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the result limit.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns true when the query matches every record.
    #[must_use]
    pub const fn is_match_all(&self) -> bool {
        self.text.is_empty()
    }
}

// ============================================================================
// SECTION: Folding
// ============================================================================

/// Folds text for case-insensitive matching.
#[must_use]
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Folds a tag list into one searchable string.
#[must_use]
pub fn fold_tags(tags: &[String]) -> String {
    let mut folded = String::new();
    for (index, tag) in tags.iter().enumerate() {
        if index > 0 {
            folded.push(TAG_SEPARATOR);
        }
        folded.push_str(&fold(tag));
    }
    folded
}

// ============================================================================
// SECTION: Ranking
// ============================================================================

/// Scores a record against a query; `None` when nothing matches.
#[must_use]
pub fn relevance(record: &DatasetRecord, query: &SearchQuery) -> Option<i64> {
    if query.is_match_all() {
        return Some(0);
    }
    let needle = query.text();
    let mut score = 0;
    if fold(&record.name).contains(needle) {
        score += NAME_WEIGHT;
    }
    if record.tags.iter().any(|tag| fold(tag).contains(needle)) {
        score += TAG_WEIGHT;
    }
    if record.description.as_deref().is_some_and(|text| fold(text).contains(needle)) {
        score += DESCRIPTION_WEIGHT;
    }
    (score > 0).then_some(score)
}

/// Orders two records most-recently-updated first, ties by ascending id.
#[must_use]
pub fn compare_recency(left: &DatasetRecord, right: &DatasetRecord) -> Ordering {
    right.updated_at.cmp(&left.updated_at).then_with(|| left.id.cmp(&right.id))
}

/// Filters and orders records for a query by linear scan.
#[must_use]
pub fn rank<'a>(
    records: impl IntoIterator<Item = &'a DatasetRecord>,
    query: &SearchQuery,
) -> Vec<DatasetRecord> {
    let mut scored: Vec<(i64, &DatasetRecord)> = records
        .into_iter()
        .filter_map(|record| relevance(record, query).map(|score| (score, record)))
        .collect();
    scored.sort_by(|(left_score, left), (right_score, right)| {
        right_score.cmp(left_score).then_with(|| compare_recency(left, right))
    });
    scored.into_iter().take(query.limit()).map(|(_, record)| record.clone()).collect()
}

/// Returns the `count` most recently updated records by linear scan.
#[must_use]
pub fn latest<'a>(
    records: impl IntoIterator<Item = &'a DatasetRecord>,
    count: usize,
) -> Vec<DatasetRecord> {
    let mut ordered: Vec<&DatasetRecord> = records.into_iter().collect();
    ordered.sort_by(|left, right| compare_recency(left, right));
    ordered.into_iter().take(count).cloned().collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::SearchQuery;
    use super::TAG_SEPARATOR;
    use super::fold_tags;

    #[test]
    fn query_strips_control_characters_and_folds_case() {
        let query = SearchQuery::new("  Sales\u{1f}DATA ", 10);
        assert_eq!(query.map(|query| query.text().to_string()), Ok("salesdata".to_string()));
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(SearchQuery::new("x", 0).is_err());
    }

    #[test]
    fn folded_tags_use_separator() {
        let folded = fold_tags(&["Alpha".to_string(), "BETA".to_string()]);
        assert_eq!(folded, format!("alpha{TAG_SEPARATOR}beta"));
    }
}
