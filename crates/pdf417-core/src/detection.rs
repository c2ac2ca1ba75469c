//! The full set of detected columns plus metadata and bounding box, and the
//! row-number reconciliation that runs before the matrix is built.
//!
//! Interior codewords are detected without knowing which barcode row they
//! belong to. Row numbers are recovered in rounds: rows where both
//! indicators agree are forced outright, then each indicator propagates its
//! row number inward along the image row, and finally codewords still
//! lacking a valid row borrow one from the nearest same-bucket neighbor.
//! Rounds repeat until the count of unresolved codewords stops shrinking.

use crate::bounds::BoundingBox;
use crate::codebook::MAX_CODEWORDS_IN_BARCODE;
use crate::codeword::Codeword;
use crate::column::DetectionResultColumn;
use crate::metadata::BarcodeMetadata;

/// Consecutive bucket mismatches tolerated while an indicator propagates its
/// row number along an image row.
const ADJUST_ROW_NUMBER_SKIP: i32 = 2;

pub struct DetectionResult<'a> {
    metadata: BarcodeMetadata,
    bounding_box: BoundingBox,
    columns: Vec<Option<DetectionResultColumn<'a>>>,
}

impl<'a> DetectionResult<'a> {
    #[must_use]
    pub fn new(metadata: BarcodeMetadata, bounding_box: BoundingBox) -> Self {
        let columns = (0..metadata.column_count() + 2).map(|_| None).collect();
        Self {
            metadata,
            bounding_box,
            columns,
        }
    }

    #[must_use]
    pub fn barcode_column_count(&self) -> i32 {
        self.metadata.column_count()
    }

    #[must_use]
    pub fn barcode_row_count(&self) -> i32 {
        self.metadata.row_count()
    }

    #[must_use]
    pub fn barcode_ec_level(&self) -> i32 {
        self.metadata.error_correction_level()
    }

    #[must_use]
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) {
        self.bounding_box = bounding_box;
    }

    pub fn set_column(&mut self, index: usize, column: Option<DetectionResultColumn<'a>>) {
        self.columns[index] = column;
    }

    /// Column at `index`; index 0 is the left indicator, `column_count + 1`
    /// the right indicator. Out-of-range and unscanned columns are absent.
    #[must_use]
    pub fn column(&self, index: i32) -> Option<&DetectionResultColumn<'a>> {
        let index = usize::try_from(index).ok()?;
        self.columns.get(index)?.as_ref()
    }

    pub fn column_mut(&mut self, index: i32) -> Option<&mut DetectionResultColumn<'a>> {
        let index = usize::try_from(index).ok()?;
        self.columns.get_mut(index)?.as_mut()
    }

    /// Run the row-number reconciliation and expose the columns for the
    /// matrix build.
    pub fn adjusted_columns(&mut self) -> &[Option<DetectionResultColumn<'a>>] {
        self.adjust_indicator_column(0);
        let last = self.columns.len() - 1;
        self.adjust_indicator_column(last);

        let mut unadjusted_count = MAX_CODEWORDS_IN_BARCODE;
        loop {
            let previous = unadjusted_count;
            unadjusted_count = self.adjust_row_numbers();
            if unadjusted_count == 0 || unadjusted_count >= previous {
                break;
            }
        }
        tracing::trace!(unadjusted_count, "row number reconciliation settled");
        &self.columns
    }

    fn adjust_indicator_column(&mut self, index: usize) {
        let metadata = self.metadata;
        if let Some(column) = self.columns[index].as_mut() {
            if column.role().is_indicator() {
                column.adjust_complete_indicator_row_numbers(&metadata);
            }
        }
    }

    fn adjust_row_numbers(&mut self) -> i32 {
        let unadjusted_count = self.adjust_row_numbers_by_row();
        if unadjusted_count == 0 {
            return 0;
        }
        let column_count = self.barcode_column_count() as usize;
        for barcode_column in 1..=column_count {
            let rows = match self.columns[barcode_column].as_ref() {
                Some(column) => column.codewords().len(),
                None => continue,
            };
            for codewords_row in 0..rows {
                let needs_adjustment = self.columns[barcode_column]
                    .as_ref()
                    .and_then(|column| column.codewords()[codewords_row])
                    .is_some_and(|codeword| !codeword.has_valid_row_number());
                if needs_adjustment {
                    self.adjust_row_number_from_neighbors(barcode_column, codewords_row);
                }
            }
        }
        unadjusted_count
    }

    fn adjust_row_numbers_by_row(&mut self) -> i32 {
        self.adjust_row_numbers_from_both_indicators();
        self.adjust_row_numbers_from_indicator(true) + self.adjust_row_numbers_from_indicator(false)
    }

    /// Rows where the two indicators agree force the row number of every
    /// interior codeword in that image row; codewords whose bucket
    /// contradicts the forced row are dropped.
    fn adjust_row_numbers_from_both_indicators(&mut self) {
        let last = self.columns.len() - 1;
        let agreed: Vec<Option<Option<i32>>> = {
            let (Some(left), Some(right)) = (
                self.columns[0].as_ref(),
                self.columns[last].as_ref(),
            ) else {
                return;
            };
            let rows = left.codewords().len().min(right.codewords().len());
            (0..rows)
                .map(|i| match (left.codewords()[i], right.codewords()[i]) {
                    (Some(l), Some(r)) if l.row_number() == r.row_number() => {
                        Some(l.row_number())
                    }
                    _ => None,
                })
                .collect()
        };
        let column_count = self.barcode_column_count() as usize;
        for barcode_column in 1..=column_count {
            let Some(column) = self.columns[barcode_column].as_mut() else {
                continue;
            };
            let codewords = column.codewords_mut();
            for (i, agreement) in agreed.iter().enumerate() {
                let Some(row_number) = agreement else { continue };
                if i >= codewords.len() {
                    break;
                }
                if let Some(codeword) = codewords[i].as_mut() {
                    codeword.set_row_number(*row_number);
                    if !codeword.has_valid_row_number() {
                        codewords[i] = None;
                    }
                }
            }
        }
    }

    /// One indicator propagates its row number inward along each image row,
    /// giving up after two consecutive bucket mismatches. Returns how many
    /// interior codewords still lack a valid row number.
    fn adjust_row_numbers_from_indicator(&mut self, left: bool) -> i32 {
        let indicator_index = if left { 0 } else { self.columns.len() - 1 };
        let Some(indicator) = self.columns[indicator_index].as_ref() else {
            return 0;
        };
        let indicator_rows: Vec<Option<Option<i32>>> = indicator
            .codewords()
            .iter()
            .map(|slot| slot.map(|codeword| codeword.row_number()))
            .collect();

        let column_count = self.barcode_column_count();
        let mut unadjusted_count = 0;
        for (codewords_row, slot) in indicator_rows.iter().enumerate() {
            let Some(indicator_row) = slot else { continue };
            let mut invalid_row_counts = 0i32;
            let columns: Vec<i32> = if left {
                (1..=column_count).collect()
            } else {
                (1..=column_count).rev().collect()
            };
            for barcode_column in columns {
                if invalid_row_counts >= ADJUST_ROW_NUMBER_SKIP {
                    break;
                }
                let Some(column) = self.columns[barcode_column as usize].as_mut() else {
                    continue;
                };
                let Some(codeword) = column
                    .codewords_mut()
                    .get_mut(codewords_row)
                    .and_then(|slot| slot.as_mut())
                else {
                    continue;
                };
                if !codeword.has_valid_row_number() {
                    match indicator_row {
                        Some(row) if codeword.is_valid_row_number(*row) => {
                            codeword.set_row_number(Some(*row));
                            invalid_row_counts = 0;
                        }
                        _ => invalid_row_counts += 1,
                    }
                }
                if !codeword.has_valid_row_number() {
                    unadjusted_count += 1;
                }
            }
        }
        unadjusted_count
    }

    /// Borrow a row number from the nearest neighbor sharing this codeword's
    /// bucket, probing the same, previous and next columns up to two image
    /// rows away, closest candidates first.
    fn adjust_row_number_from_neighbors(&mut self, barcode_column: usize, codewords_row: usize) {
        let Some(codeword) = self.columns[barcode_column]
            .as_ref()
            .and_then(|column| column.codewords()[codewords_row])
        else {
            return;
        };

        let empty: &[Option<Codeword>] = &[];
        let previous = self.columns[barcode_column - 1]
            .as_ref()
            .map_or(empty, |column| column.codewords());
        let next = self
            .columns
            .get(barcode_column + 1)
            .and_then(|column| column.as_ref())
            .map_or(previous, |column| column.codewords());
        let current = self.columns[barcode_column]
            .as_ref()
            .map_or(empty, |column| column.codewords());

        let at = |slice: &[Option<Codeword>], row: i32| -> Option<Codeword> {
            usize::try_from(row)
                .ok()
                .and_then(|row| slice.get(row).copied().flatten())
        };
        let row = codewords_row as i32;
        let neighbors: [Option<Codeword>; 14] = [
            at(current, row - 1),
            at(current, row + 1),
            at(previous, row),
            at(next, row),
            at(previous, row - 1),
            at(next, row - 1),
            at(previous, row + 1),
            at(next, row + 1),
            at(current, row - 2),
            at(current, row + 2),
            at(previous, row - 2),
            at(next, row - 2),
            at(previous, row + 2),
            at(next, row + 2),
        ];

        let mut adjusted = codeword;
        for neighbor in neighbors.iter().flatten() {
            if neighbor.has_valid_row_number() && neighbor.bucket() == adjusted.bucket() {
                adjusted.set_row_number(neighbor.row_number());
                if let Some(column) = self.columns[barcode_column].as_mut() {
                    column.codewords_mut()[codewords_row] = Some(adjusted);
                }
                return;
            }
        }
    }
}
