//! A vertical strip of codeword observations indexed by image row.
//!
//! Columns come in three roles: the two row-indicator columns (leftmost and
//! rightmost), which additionally infer symbol-wide metadata from their
//! codeword values, and interior data columns. Slot storage comes from the
//! decoder's per-call arena.

use bumpalo::Bump;

use crate::bounds::BoundingBox;
use crate::codebook::{MAX_ROWS_IN_BARCODE, MIN_COLUMNS_IN_BARCODE, MIN_ROWS_IN_BARCODE};
use crate::codeword::Codeword;
use crate::metadata::{BarcodeMetadata, BarcodeValue};

/// Search window for [`DetectionResultColumn::codeword_nearby`].
const MAX_NEARBY_DISTANCE: usize = 5;

/// What a column contributes to the symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnRole {
    Interior,
    LeftIndicator,
    RightIndicator,
}

impl ColumnRole {
    #[must_use]
    pub fn is_indicator(self) -> bool {
        !matches!(self, ColumnRole::Interior)
    }
}

pub struct DetectionResultColumn<'a> {
    bounding_box: BoundingBox,
    codewords: &'a mut [Option<Codeword>],
    role: ColumnRole,
}

impl<'a> DetectionResultColumn<'a> {
    /// Create an empty column spanning the box's vertical extent.
    pub fn new_in(arena: &'a Bump, bounding_box: BoundingBox, role: ColumnRole) -> Self {
        let rows = (bounding_box.max_y() - bounding_box.min_y() + 1) as usize;
        Self {
            bounding_box,
            codewords: arena.alloc_slice_fill_copy(rows, None),
            role,
        }
    }

    #[must_use]
    pub fn role(&self) -> ColumnRole {
        self.role
    }

    #[must_use]
    pub fn is_left_indicator(&self) -> bool {
        self.role == ColumnRole::LeftIndicator
    }

    #[must_use]
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    #[inline]
    #[must_use]
    pub fn image_row_to_codeword_index(&self, image_row: i32) -> usize {
        (image_row - self.bounding_box.min_y()) as usize
    }

    pub fn set_codeword(&mut self, image_row: i32, codeword: Codeword) {
        let index = self.image_row_to_codeword_index(image_row);
        self.codewords[index] = Some(codeword);
    }

    #[must_use]
    pub fn codeword(&self, image_row: i32) -> Option<Codeword> {
        let index = self.image_row_to_codeword_index(image_row);
        self.codewords.get(index).copied().flatten()
    }

    /// The stored codeword closest to `image_row` within a small window.
    #[must_use]
    pub fn codeword_nearby(&self, image_row: i32) -> Option<Codeword> {
        if let Some(codeword) = self.codeword(image_row) {
            return Some(codeword);
        }
        let index = self.image_row_to_codeword_index(image_row);
        for distance in 1..MAX_NEARBY_DISTANCE {
            if index >= distance {
                if let Some(codeword) = self.codewords[index - distance] {
                    return Some(codeword);
                }
            }
            if index + distance < self.codewords.len() {
                if let Some(codeword) = self.codewords[index + distance] {
                    return Some(codeword);
                }
            }
        }
        None
    }

    #[must_use]
    pub fn codewords(&self) -> &[Option<Codeword>] {
        self.codewords
    }

    pub fn codewords_mut(&mut self) -> &mut [Option<Codeword>] {
        self.codewords
    }

    // ------------------------------------------------------------------
    // Row-indicator behavior
    // ------------------------------------------------------------------

    /// Infer (rows, columns, EC level) from the majority vote of this
    /// indicator column's codewords, then drop codewords contradicting the
    /// consensus. Returns `None` when the vote is incomplete or the result
    /// is outside the symbology's limits.
    pub fn barcode_metadata(&mut self) -> Option<BarcodeMetadata> {
        let is_left = self.is_left_indicator();
        let mut column_count = BarcodeValue::new();
        let mut row_count_upper = BarcodeValue::new();
        let mut row_count_lower = BarcodeValue::new();
        let mut ec_level = BarcodeValue::new();

        for slot in self.codewords.iter_mut() {
            let Some(codeword) = slot.as_mut() else {
                continue;
            };
            codeword.set_row_number_as_row_indicator();
            let indicator_value = codeword.value() % 30;
            let mut row_number = codeword.row_number().unwrap_or(0);
            if !is_left {
                row_number += 2;
            }
            match row_number % 3 {
                0 => row_count_upper.set_value(indicator_value * 3 + 1),
                1 => {
                    ec_level.set_value(indicator_value / 3);
                    row_count_lower.set_value(indicator_value % 3);
                }
                _ => column_count.set_value(indicator_value + 1),
            }
        }

        let columns = column_count.value();
        let uppers = row_count_upper.value();
        let lowers = row_count_lower.value();
        let levels = ec_level.value();
        if columns.is_empty() || uppers.is_empty() || lowers.is_empty() || levels.is_empty() {
            return None;
        }
        let row_count = uppers[0] + lowers[0];
        if columns[0] < MIN_COLUMNS_IN_BARCODE
            || row_count < MIN_ROWS_IN_BARCODE
            || row_count > MAX_ROWS_IN_BARCODE
        {
            return None;
        }
        let metadata = BarcodeMetadata::new(columns[0], uppers[0], lowers[0], levels[0]);
        self.remove_incorrect_codewords(&metadata);
        Some(metadata)
    }

    /// Number of image rows mapped to each barcode row, used to detect rows
    /// missing above or below the detected region.
    pub fn row_heights(&mut self) -> Option<Vec<i32>> {
        let metadata = self.barcode_metadata()?;
        self.adjust_incomplete_indicator_row_numbers(&metadata);
        let mut heights = vec![0i32; metadata.row_count() as usize];
        for codeword in self.codewords.iter().flatten() {
            if let Some(row) = codeword.row_number() {
                if row >= 0 && (row as usize) < heights.len() {
                    heights[row as usize] += 1;
                }
            }
        }
        Some(heights)
    }

    /// Full smoothing pass used when the column is installed into the
    /// detection result: assigns indicator row numbers, drops codewords that
    /// contradict the metadata, and removes observations whose row numbers
    /// jump implausibly.
    pub fn adjust_complete_indicator_row_numbers(&mut self, metadata: &BarcodeMetadata) {
        for slot in self.codewords.iter_mut() {
            if let Some(codeword) = slot.as_mut() {
                codeword.set_row_number_as_row_indicator();
            }
        }
        self.remove_incorrect_codewords(metadata);

        let (first_row, last_row) = self.indicator_row_range();
        let mut barcode_row = -1i32;
        let mut max_row_height = 1i32;
        let mut current_row_height = 0i32;
        for index in first_row..last_row {
            let Some(codeword) = self.codewords[index] else {
                continue;
            };
            let row = codeword.row_number().unwrap_or(-1);
            let row_difference = row - barcode_row;
            if row_difference == 0 {
                current_row_height += 1;
            } else if row_difference == 1 {
                max_row_height = max_row_height.max(current_row_height);
                current_row_height = 1;
                barcode_row = row;
            } else if row_difference < 0
                || row >= metadata.row_count()
                || row_difference > index as i32
            {
                self.codewords[index] = None;
            } else {
                let checked_rows = if max_row_height > 2 {
                    (max_row_height - 2) * row_difference
                } else {
                    row_difference
                };
                let mut close_previous_codeword_found = checked_rows >= index as i32;
                for i in 1..=checked_rows as usize {
                    if close_previous_codeword_found {
                        break;
                    }
                    close_previous_codeword_found = self.codewords[index - i].is_some();
                }
                if close_previous_codeword_found {
                    self.codewords[index] = None;
                } else {
                    barcode_row = row;
                    current_row_height = 1;
                }
            }
        }
    }

    /// Lighter smoothing used by [`Self::row_heights`]: assigns indicator
    /// row numbers and only drops codewords whose row is out of range.
    fn adjust_incomplete_indicator_row_numbers(&mut self, metadata: &BarcodeMetadata) {
        let (first_row, last_row) = self.indicator_row_range();
        let mut barcode_row = -1i32;
        for index in first_row..last_row {
            let Some(codeword) = self.codewords[index].as_mut() else {
                continue;
            };
            codeword.set_row_number_as_row_indicator();
            let row = codeword.row_number().unwrap_or(-1);
            if row == barcode_row {
                continue;
            }
            if row >= metadata.row_count() && row - barcode_row != 1 {
                self.codewords[index] = None;
            } else {
                barcode_row = row;
            }
        }
    }

    /// Codeword index range covered by this indicator's own vertical edge.
    fn indicator_row_range(&self) -> (usize, usize) {
        let (top, bottom) = if self.is_left_indicator() {
            (self.bounding_box.top_left(), self.bounding_box.bottom_left())
        } else {
            (
                self.bounding_box.top_right(),
                self.bounding_box.bottom_right(),
            )
        };
        let first = self.image_row_to_codeword_index(top.y as i32);
        let last = self
            .image_row_to_codeword_index(bottom.y as i32)
            .min(self.codewords.len());
        (first, last)
    }

    fn remove_incorrect_codewords(&mut self, metadata: &BarcodeMetadata) {
        let is_left = self.is_left_indicator();
        for slot in self.codewords.iter_mut() {
            let Some(codeword) = slot.as_ref() else {
                continue;
            };
            let indicator_value = codeword.value() % 30;
            let mut row_number = codeword.row_number().unwrap_or(-1);
            if row_number > metadata.row_count() {
                *slot = None;
                continue;
            }
            if !is_left {
                row_number += 2;
            }
            let keep = match row_number % 3 {
                0 => indicator_value * 3 + 1 == metadata.row_count_upper_part(),
                1 => {
                    indicator_value / 3 == metadata.error_correction_level()
                        && indicator_value % 3 == metadata.row_count_lower_part()
                }
                _ => indicator_value + 1 == metadata.column_count(),
            };
            if !keep {
                *slot = None;
            }
        }
    }
}
