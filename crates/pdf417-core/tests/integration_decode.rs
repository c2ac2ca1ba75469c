#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::uninlined_format_args)]

use bumpalo::Bump;
use pdf417_core::column::{ColumnRole, DetectionResultColumn};
use pdf417_core::codeword::Codeword;
use pdf417_core::bounds::BoundingBox;
use pdf417_core::image::Point;
use pdf417_core::test_utils;
use pdf417_core::{
    decoder, scanner, BitMatrix, CornerPoints, DecodeError, DecodeOptions, ScanningDecoder,
};

fn decode_symbol(
    symbol: &test_utils::SyntheticSymbol,
    corners: &CornerPoints,
) -> Result<pdf417_core::DecoderResult, DecodeError> {
    let image = BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
    let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
    let mut decoder = ScanningDecoder::new();
    decoder.decode(&image, corners, &options)
}

#[test]
fn test_pristine_symbol_decodes_exactly() {
    // rows=3, columns=2, EC level 1 (4 parity codewords), payload "AB"
    let symbol = test_utils::generate_symbol("AB", 2, 1, 3, 8);
    let result = decode_symbol(&symbol, &symbol.corners).unwrap();
    assert_eq!(result.text, "AB");
    assert_eq!(result.errors_corrected, 0);
    assert_eq!(result.erasures, 0);
    assert_eq!(result.ec_level, 1);
}

#[test]
fn test_blanked_cell_becomes_erasure() {
    let (codewords, rows) = test_utils::build_symbol_codewords("AB", 2, 1);
    let mut symbol = test_utils::render_symbol(&codewords, rows, 2, 1, 3, 8, 12);
    // wipe the pad codeword cell at row 1, column 0
    test_utils::blank_cell(&mut symbol, rows, 2, 2);
    let result = decode_symbol(&symbol, &symbol.corners).unwrap();
    assert_eq!(result.text, "AB");
    assert_eq!(result.erasures, 1);
    assert_eq!(result.errors_corrected, 0);
}

#[test]
fn test_corrupted_codewords_are_corrected() {
    let (mut codewords, rows) = test_utils::build_symbol_codewords("AB", 2, 1);
    // flip two interior data cells to different valid codewords
    codewords[1] = (codewords[1] + 100) % 900;
    codewords[2] = (codewords[2] + 250) % 900;
    let symbol = test_utils::render_symbol(&codewords, rows, 2, 1, 3, 8, 12);
    let result = decode_symbol(&symbol, &symbol.corners).unwrap();
    assert_eq!(result.text, "AB");
    assert_eq!(result.errors_corrected, 2);
    assert_eq!(result.erasures, 0);
}

#[test]
fn test_truncated_stream_is_format_error() {
    let mut codewords = vec![3, 1, 2];
    assert_eq!(
        decoder::verify_codeword_count(&mut codewords, 2),
        Err(DecodeError::FormatError)
    );
}

#[test]
fn test_indicators_disagreeing_on_everything_fail() {
    let arena = Bump::new();
    let bounding_box = BoundingBox::new(
        400,
        100,
        Some(Point::new(10.0, 0.0)),
        Some(Point::new(10.0, 89.0)),
        Some(Point::new(390.0, 0.0)),
        Some(Point::new(390.0, 89.0)),
    )
    .unwrap();

    let fill = |column: &mut DetectionResultColumn<'_>,
                left: bool,
                rows: i32,
                columns: i32,
                ec_level: i32| {
        for barcode_row in 0..rows.min(9) {
            let cluster_index = barcode_row % 3;
            let value = if left {
                match cluster_index {
                    0 => (rows - 1) / 3,
                    1 => ec_level * 3 + (rows - 1) % 3,
                    _ => columns - 1,
                }
            } else {
                match cluster_index {
                    0 => columns - 1,
                    1 => (rows - 1) / 3,
                    _ => ec_level * 3 + (rows - 1) % 3,
                }
            };
            let codeword = Codeword::new(
                0,
                17,
                cluster_index * 3,
                (barcode_row / 3) * 30 + value,
            );
            for band_row in 0..10 {
                column.set_codeword(barcode_row * 10 + band_row, codeword);
            }
        }
    };

    // all three of (rows, columns, EC level) differ between the sides
    let mut left =
        DetectionResultColumn::new_in(&arena, bounding_box, ColumnRole::LeftIndicator);
    fill(&mut left, true, 6, 2, 1);
    let mut right =
        DetectionResultColumn::new_in(&arena, bounding_box, ColumnRole::RightIndicator);
    fill(&mut right, false, 9, 3, 2);
    assert!(scanner::barcode_metadata(Some(&mut left), Some(&mut right)).is_none());

    // agreement on a single parameter is sufficient cross-evidence
    let mut left =
        DetectionResultColumn::new_in(&arena, bounding_box, ColumnRole::LeftIndicator);
    fill(&mut left, true, 6, 2, 1);
    let mut right =
        DetectionResultColumn::new_in(&arena, bounding_box, ColumnRole::RightIndicator);
    fill(&mut right, false, 6, 3, 2);
    let metadata = scanner::barcode_metadata(Some(&mut left), Some(&mut right)).unwrap();
    assert_eq!(metadata.row_count(), 6);
    assert_eq!(metadata.column_count(), 2);
}

#[test]
fn test_missing_anchors_fail_at_bounding_box() {
    let symbol = test_utils::generate_symbol("AB", 2, 1, 3, 8);
    let corners = CornerPoints {
        top_left: None,
        bottom_left: Some(Point::new(10.0, 20.0)),
        top_right: None,
        bottom_right: None,
    };
    assert_eq!(
        decode_symbol(&symbol, &corners),
        Err(DecodeError::NotFound)
    );
    assert_eq!(
        decode_symbol(&symbol, &CornerPoints::default()),
        Err(DecodeError::NotFound)
    );
}

#[test]
fn test_decode_with_only_left_corners() {
    // right edge unknown: the box extends to the image edge and the right
    // indicator is recovered by the interior scan
    let symbol = test_utils::generate_symbol("CLUSTER", 3, 2, 3, 9);
    let corners = CornerPoints {
        top_right: None,
        bottom_right: None,
        ..symbol.corners
    };
    let result = decode_symbol(&symbol, &corners).unwrap();
    assert_eq!(result.text, "CLUSTER");
}

#[test]
fn test_decode_with_only_right_corners() {
    let symbol = test_utils::generate_symbol("MIRROR", 3, 2, 3, 9);
    let corners = CornerPoints {
        top_left: None,
        bottom_left: None,
        ..symbol.corners
    };
    let result = decode_symbol(&symbol, &corners).unwrap();
    assert_eq!(result.text, "MIRROR");
}

#[test]
fn test_larger_symbol_and_level() {
    let symbol = test_utils::generate_symbol("The quick brown fox, 42 jumps!", 4, 3, 3, 9);
    let result = decode_symbol(&symbol, &symbol.corners).unwrap();
    assert_eq!(result.text, "The quick brown fox, 42 jumps!");
    assert_eq!(result.ec_level, 3);
}

#[test]
fn test_decode_is_deterministic() {
    let symbol = test_utils::generate_symbol("DETERMINISM", 3, 2, 3, 8);
    let first = decode_symbol(&symbol, &symbol.corners).unwrap();
    let second = decode_symbol(&symbol, &symbol.corners).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_width_adaptation_does_not_leak_between_calls() {
    let symbol = test_utils::generate_symbol("LOCAL STATE", 3, 2, 3, 8);
    let image = BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
    let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
    let mut decoder = ScanningDecoder::new();
    let first = decoder.decode(&image, &symbol.corners, &options).unwrap();
    // same reusable decoder, same options: identical outcome
    let second = decoder.decode(&image, &symbol.corners, &options).unwrap();
    assert_eq!(first, second);
    assert_eq!(options.min_codeword_width, symbol.codeword_width);
    assert_eq!(options.max_codeword_width, symbol.codeword_width);
}

#[test]
fn test_erasures_and_corrections_stay_within_parity_budget() {
    let (mut codewords, rows) = test_utils::build_symbol_codewords("BUDGET CHECK", 3, 2);
    codewords[2] = (codewords[2] + 77) % 900;
    let mut symbol = test_utils::render_symbol(&codewords, rows, 3, 2, 3, 8, 12);
    test_utils::blank_cell(&mut symbol, rows, 3, 4);
    let result = decode_symbol(&symbol, &symbol.corners).unwrap();
    assert_eq!(result.text, "BUDGET CHECK");
    let num_ec_codewords = 1usize << (result.ec_level + 1);
    assert!(result.erasures + 2 * result.errors_corrected <= num_ec_codewords);
}
