//! Codeword detection and column scanning.
//!
//! This module handles the geometry-driven stage of the pipeline:
//! 1. **Codeword detection**: nudge a predicted start column onto the
//!    leading bar, accumulate the 8 bar/space runs, and decode them through
//!    the codebook.
//! 2. **Row-indicator walk**: track an indicator column through every image
//!    row, following the detected edge as scan lines drift.
//! 3. **Metadata and box refinement**: reconcile the two indicators and
//!    extend the bounding box over rows missing from the initial detection.
//! 4. **Interior scanning**: predict each codeword's start column from its
//!    neighbors and adapt the expected width as evidence accumulates.

use bumpalo::Bump;
use multiversion::multiversion;

use crate::bounds::BoundingBox;
use crate::codebook::CODEBOOK;
use crate::codeword::{bucket_of_pattern, Codeword, ModuleBitCount, BARS_IN_MODULE};
use crate::column::{ColumnRole, DetectionResultColumn};
use crate::detection::DetectionResult;
use crate::image::{BitMatrix, Point};
use crate::metadata::BarcodeMetadata;
use crate::DecodeError;

/// How far (in pixels) a codeword may start before or after its predicted
/// start column, and how far its width may fall outside the running bounds.
pub const CODEWORD_SKEW_SIZE: i32 = 2;

/// Nudge `codeword_start_column` so that the pixel run starting there is the
/// codeword's leading element: no black pixels immediately before it when
/// scanning left-to-right, none after it when scanning right-to-left. Gives
/// up and returns the original column beyond [`CODEWORD_SKEW_SIZE`] pixels.
fn adjust_codeword_start_column(
    image: &BitMatrix<'_>,
    min_column: i32,
    max_column: i32,
    left_to_right: bool,
    codeword_start_column: i32,
    image_row: i32,
) -> i32 {
    let mut corrected_start_column = codeword_start_column;
    let mut increment = if left_to_right { -1 } else { 1 };
    let mut towards = left_to_right;
    // probe in one direction, then flip and retry once
    for _ in 0..2 {
        while (if towards {
            corrected_start_column >= min_column
        } else {
            corrected_start_column < max_column
        }) && towards == image.get(corrected_start_column, image_row)
        {
            if (codeword_start_column - corrected_start_column).abs() > CODEWORD_SKEW_SIZE {
                return codeword_start_column;
            }
            corrected_start_column += increment;
        }
        increment = -increment;
        towards = !towards;
    }
    corrected_start_column
}

/// Accumulate the 8 bar/space pixel runs of one codeword, walking outward
/// from `start_column`. Succeeds with 7 runs when the scan hits the column
/// limit, so codewords touching the region edge still decode.
#[multiversion(targets = "simd")]
fn module_bit_count<'a>(
    image: &BitMatrix<'a>,
    min_column: i32,
    max_column: i32,
    left_to_right: bool,
    start_column: i32,
    image_row: i32,
) -> Option<ModuleBitCount> {
    let mut image_column = start_column;
    let mut counts = [0i32; BARS_IN_MODULE];
    let mut module_number = 0usize;
    let increment = if left_to_right { 1 } else { -1 };
    let mut previous_pixel_value = left_to_right;
    while (if left_to_right {
        image_column < max_column
    } else {
        image_column >= min_column
    }) && module_number < BARS_IN_MODULE
    {
        if image.get(image_column, image_row) == previous_pixel_value {
            counts[module_number] += 1;
            image_column += increment;
        } else {
            module_number += 1;
            previous_pixel_value = !previous_pixel_value;
        }
    }
    let boundary = if left_to_right { max_column } else { min_column };
    if module_number == BARS_IN_MODULE
        || (image_column == boundary && module_number == BARS_IN_MODULE - 1)
    {
        Some(counts)
    } else {
        None
    }
}

fn check_codeword_skew(codeword_size: i32, min_codeword_width: i32, max_codeword_width: i32) -> bool {
    min_codeword_width - CODEWORD_SKEW_SIZE <= codeword_size
        && codeword_size <= max_codeword_width + CODEWORD_SKEW_SIZE
}

/// Detect one codeword at `(start_column, image_row)`. Failures are common
/// and expected; they are reported as absence, never as an error.
pub fn detect_codeword(
    image: &BitMatrix<'_>,
    min_column: i32,
    max_column: i32,
    left_to_right: bool,
    start_column: i32,
    image_row: i32,
    min_codeword_width: i32,
    max_codeword_width: i32,
) -> Option<Codeword> {
    let start_column = adjust_codeword_start_column(
        image,
        min_column,
        max_column,
        left_to_right,
        start_column,
        image_row,
    );
    let mut counts = module_bit_count(
        image,
        min_column,
        max_column,
        left_to_right,
        start_column,
        image_row,
    )?;
    let codeword_bit_count: i32 = counts.iter().sum();
    let (start_column, end_column) = if left_to_right {
        (start_column, start_column + codeword_bit_count)
    } else {
        // normalize to the canonical left-to-right orientation
        counts.reverse();
        (start_column - codeword_bit_count, start_column)
    };

    // TODO use the start/stop pattern columns to detect whether one bar type
    // prints wider than the other and compensate before lookup.
    if !check_codeword_skew(codeword_bit_count, min_codeword_width, max_codeword_width) {
        return None;
    }

    let decoded_value = CODEBOOK.decoded_value(&counts)?;
    let codeword = CODEBOOK.codeword(decoded_value)?;
    Some(Codeword::new(
        start_column,
        end_column,
        bucket_of_pattern(decoded_value),
        i32::from(codeword),
    ))
}

/// Walk an indicator column through every image row of the box, downward
/// from the anchor and then upward, tracking the detected edge so the next
/// row's probe starts where this row's codeword actually was.
pub fn row_indicator_column<'a>(
    arena: &'a Bump,
    image: &BitMatrix<'_>,
    bounding_box: &BoundingBox,
    start_point: Point,
    left_to_right: bool,
    min_codeword_width: i32,
    max_codeword_width: i32,
) -> DetectionResultColumn<'a> {
    let role = if left_to_right {
        ColumnRole::LeftIndicator
    } else {
        ColumnRole::RightIndicator
    };
    let mut column = DetectionResultColumn::new_in(arena, *bounding_box, role);
    for pass in 0..2 {
        let increment: i32 = if pass == 0 { 1 } else { -1 };
        let mut start_column = start_point.x as i32;
        let mut image_row = start_point.y as i32;
        while image_row <= bounding_box.max_y() && image_row >= bounding_box.min_y() {
            if let Some(codeword) = detect_codeword(
                image,
                0,
                image.width as i32,
                left_to_right,
                start_column,
                image_row,
                min_codeword_width,
                max_codeword_width,
            ) {
                column.set_codeword(image_row, codeword);
                start_column = if left_to_right {
                    codeword.start_x()
                } else {
                    codeword.end_x()
                };
            }
            image_row += increment;
        }
    }
    column
}

/// Reconcile the metadata read independently by each indicator column.
///
/// One absent side yields the other's result. When both are present the
/// left wins unless the two disagree on *all three* of column count, EC
/// level and row count; agreement on any single parameter is taken as
/// sufficient cross-evidence.
pub fn barcode_metadata(
    left: Option<&mut DetectionResultColumn<'_>>,
    right: Option<&mut DetectionResultColumn<'_>>,
) -> Option<BarcodeMetadata> {
    let left_metadata = left.and_then(|column| column.barcode_metadata());
    let Some(left_metadata) = left_metadata else {
        return right.and_then(|column| column.barcode_metadata());
    };
    let Some(right_metadata) = right.and_then(|column| column.barcode_metadata()) else {
        return Some(left_metadata);
    };
    if left_metadata.column_count() != right_metadata.column_count()
        && left_metadata.error_correction_level() != right_metadata.error_correction_level()
        && left_metadata.row_count() != right_metadata.row_count()
    {
        tracing::debug!(?left_metadata, ?right_metadata, "row indicators disagree");
        return None;
    }
    Some(left_metadata)
}

/// Work out how many barcode rows fall above or below the detected region
/// of an indicator column and extend its box over them. Absence of the
/// column (or of usable row heights) is not an error; a degenerate
/// extension is.
pub fn adjust_bounding_box(
    column: Option<&mut DetectionResultColumn<'_>>,
) -> Result<Option<BoundingBox>, DecodeError> {
    let Some(column) = column else {
        return Ok(None);
    };
    let Some(row_heights) = column.row_heights() else {
        return Ok(None);
    };
    let max_row_height = row_heights.iter().copied().max().unwrap_or(-1);

    let mut missing_start_rows = 0;
    for &height in &row_heights {
        missing_start_rows += max_row_height - height;
        if height > 0 {
            break;
        }
    }
    let codewords = column.codewords();
    let mut row = 0usize;
    while missing_start_rows > 0 && row < codewords.len() && codewords[row].is_none() {
        missing_start_rows -= 1;
        row += 1;
    }

    let mut missing_end_rows = 0;
    for &height in row_heights.iter().rev() {
        missing_end_rows += max_row_height - height;
        if height > 0 {
            break;
        }
    }
    let mut row = codewords.len();
    while missing_end_rows > 0 && row > 0 && codewords[row - 1].is_none() {
        missing_end_rows -= 1;
        row -= 1;
    }

    column
        .bounding_box()
        .add_missing_rows(
            missing_start_rows,
            missing_end_rows,
            column.is_left_indicator(),
        )
        .map(Some)
        .ok_or(DecodeError::NotFound)
}

/// Predict where the codeword of `barcode_column` starts in `image_row`.
///
/// Preference order: the neighboring column's codeword in this exact row,
/// then a nearby codeword in this column, then a nearby one in the
/// neighboring column, then extrapolation from whatever column has any
/// codeword at all, and finally the bounding-box edge.
pub fn get_start_column(
    detection_result: &DetectionResult<'_>,
    barcode_column: i32,
    image_row: i32,
    left_to_right: bool,
) -> i32 {
    let offset: i32 = if left_to_right { 1 } else { -1 };
    let is_valid_column =
        |column: i32| column >= 0 && column <= detection_result.barcode_column_count() + 1;

    if is_valid_column(barcode_column - offset) {
        if let Some(codeword) = detection_result
            .column(barcode_column - offset)
            .and_then(|column| column.codeword(image_row))
        {
            return if left_to_right {
                codeword.end_x()
            } else {
                codeword.start_x()
            };
        }
    }
    if let Some(codeword) = detection_result
        .column(barcode_column)
        .and_then(|column| column.codeword_nearby(image_row))
    {
        return if left_to_right {
            codeword.start_x()
        } else {
            codeword.end_x()
        };
    }
    if is_valid_column(barcode_column - offset) {
        if let Some(codeword) = detection_result
            .column(barcode_column - offset)
            .and_then(|column| column.codeword_nearby(image_row))
        {
            return if left_to_right {
                codeword.end_x()
            } else {
                codeword.start_x()
            };
        }
    }
    if let Some(start) = predict_start_from_previous_columns(
        detection_result,
        barcode_column,
        left_to_right,
        offset,
        &is_valid_column,
    ) {
        return start;
    }
    if left_to_right {
        detection_result.bounding_box().min_x()
    } else {
        detection_result.bounding_box().max_x()
    }
}

/// Extrapolate a start column from the first codeword found while walking
/// back through previous columns, stepping one codeword width per skipped
/// column. The width of that distant codeword can overshoot when column
/// spacing is irregular; alternate predictors belong here.
fn predict_start_from_previous_columns(
    detection_result: &DetectionResult<'_>,
    barcode_column: i32,
    left_to_right: bool,
    offset: i32,
    is_valid_column: &dyn Fn(i32) -> bool,
) -> Option<i32> {
    let mut barcode_column = barcode_column;
    let mut skipped_columns = 0;
    while is_valid_column(barcode_column - offset) {
        barcode_column -= offset;
        if let Some(column) = detection_result.column(barcode_column) {
            for codeword in column.codewords().iter().flatten() {
                let far_side = if left_to_right {
                    codeword.end_x()
                } else {
                    codeword.start_x()
                };
                return Some(far_side + offset * skipped_columns * codeword.width());
            }
        }
        skipped_columns += 1;
    }
    None
}
