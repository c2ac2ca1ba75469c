//! Vote histograms over conflicting codeword observations, and the symbol
//! metadata recovered from the row-indicator columns.

use std::collections::BTreeMap;

/// A multiset of observed values with confidence counts. Ordered storage
/// keeps ties deterministic, which the ambiguity search relies on.
#[derive(Clone, Debug, Default)]
pub struct BarcodeValue {
    votes: BTreeMap<i32, i32>,
}

impl BarcodeValue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of `value`.
    pub fn set_value(&mut self, value: i32) {
        *self.votes.entry(value).or_insert(0) += 1;
    }

    /// All values sharing the maximum confidence: empty when nothing was
    /// observed, a singleton for a clear winner, several entries for a tie.
    #[must_use]
    pub fn value(&self) -> Vec<i32> {
        let max = self.votes.values().copied().max().unwrap_or(0);
        self.votes
            .iter()
            .filter(|&(_, &count)| count == max)
            .map(|(&value, _)| value)
            .collect()
    }

    #[must_use]
    pub fn confidence(&self, value: i32) -> i32 {
        self.votes.get(&value).copied().unwrap_or(0)
    }
}

/// Symbol-wide metadata inferred from the row-indicator columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarcodeMetadata {
    column_count: i32,
    row_count_upper_part: i32,
    row_count_lower_part: i32,
    error_correction_level: i32,
}

impl BarcodeMetadata {
    #[must_use]
    pub fn new(
        column_count: i32,
        row_count_upper_part: i32,
        row_count_lower_part: i32,
        error_correction_level: i32,
    ) -> Self {
        Self {
            column_count,
            row_count_upper_part,
            row_count_lower_part,
            error_correction_level,
        }
    }

    #[must_use]
    pub fn column_count(&self) -> i32 {
        self.column_count
    }

    #[must_use]
    pub fn row_count(&self) -> i32 {
        self.row_count_upper_part + self.row_count_lower_part
    }

    #[must_use]
    pub fn row_count_upper_part(&self) -> i32 {
        self.row_count_upper_part
    }

    #[must_use]
    pub fn row_count_lower_part(&self) -> i32 {
        self.row_count_lower_part
    }

    #[must_use]
    pub fn error_correction_level(&self) -> i32 {
        self.error_correction_level
    }
}
