#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pdf417_core::test_utils;
use pdf417_core::{BitMatrix, DecodeOptions, ScanningDecoder};

fn decode(
    symbol: &test_utils::SyntheticSymbol,
) -> Result<pdf417_core::DecoderResult, pdf417_core::DecodeError> {
    let image = BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
    let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
    ScanningDecoder::new().decode(&image, &symbol.corners, &options)
}

#[test]
fn test_survives_scattered_pixel_flips() {
    // 6 flipped pixels cause at most 6 bad cells; level 3 carries 16 parity
    // codewords, so even the worst case stays correctable
    let mut rng = ChaCha8Rng::seed_from_u64(1207);
    for round in 0..5 {
        let mut symbol = test_utils::generate_symbol("ROBUST PAYLOAD 99", 3, 3, 4, 10);
        test_utils::flip_pixels(&mut symbol, &mut rng, 6);
        let result = decode(&symbol).unwrap_or_else(|e| {
            panic!("round {} failed to decode: {:?}", round, e);
        });
        assert_eq!(result.text, "ROBUST PAYLOAD 99", "round {}", round);
    }
}

#[test]
fn test_single_pixel_bar_width_errors() {
    // widen one bar of an interior codeword by one pixel on every image row
    // of its band: resampling and the closest-match fallback absorb it
    let mut symbol = test_utils::generate_symbol("WIDTH", 2, 2, 4, 10);
    let module_width = 4usize;
    let margin = 4 * module_width;
    // inside the first interior column, one pixel right of its start
    let x = margin + 34 * module_width + module_width;
    for band_row in 0..10 {
        let y = margin + band_row;
        symbol.data[y * symbol.width + x] = 1;
    }
    let result = decode(&symbol).unwrap();
    assert_eq!(result.text, "WIDTH");
}

#[test]
fn test_corrupt_beyond_parity_fails_with_checksum() {
    let (mut codewords, rows) = test_utils::build_symbol_codewords("AB", 2, 0);
    // level 0 has 2 parity codewords and corrects a single error; these two
    // errors are paired so their first syndrome cancels, which leaves no
    // consistent single-error explanation either
    codewords[1] = (codewords[1] + 7) % 929;
    codewords[2] = (codewords[2] + 929 - 21) % 929;
    let symbol = test_utils::render_symbol(&codewords, rows, 2, 0, 3, 8, 12);
    assert_eq!(decode(&symbol), Err(pdf417_core::DecodeError::ChecksumError));
}

#[test]
fn test_missing_bottom_rows_recovered_from_indicator_heights() {
    // hand the decoder corner points that stop short of the last barcode
    // row; the indicator row heights reveal the missing rows and the box is
    // extended downward
    let symbol = test_utils::generate_symbol("MISSING ROWS", 2, 2, 3, 10);
    let mut corners = symbol.corners;
    let bottom_left = corners.bottom_left.unwrap();
    let bottom_right = corners.bottom_right.unwrap();
    corners.bottom_left = Some(pdf417_core::Point::new(bottom_left.x, bottom_left.y - 12.0));
    corners.bottom_right = Some(pdf417_core::Point::new(bottom_right.x, bottom_right.y - 12.0));
    let image = BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
    let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
    let result = ScanningDecoder::new()
        .decode(&image, &corners, &options)
        .unwrap();
    assert_eq!(result.text, "MISSING ROWS");
}

#[test]
fn test_reusable_decoder_across_different_symbols() {
    let mut decoder = ScanningDecoder::new();
    for (payload, columns, level) in [
        ("FIRST", 2, 1),
        ("Second symbol", 3, 2),
        ("THIRD 333", 4, 1),
    ] {
        let symbol = test_utils::generate_symbol(payload, columns, level, 3, 9);
        let image =
            BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
        let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
        let result = decoder.decode(&image, &symbol.corners, &options).unwrap();
        assert_eq!(result.text, payload);
    }
}
