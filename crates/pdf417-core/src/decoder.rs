//! Matrix reconstruction, ambiguity search and error-correction
//! orchestration: everything between the scanned columns and the decoded
//! byte stream.

use crate::bitstream;
use crate::codebook::MAX_CODEWORDS_IN_BARCODE;
use crate::config::DecodeOptions;
use crate::detection::DetectionResult;
use crate::ecc;
use crate::metadata::BarcodeValue;
use crate::{DecodeError, DecoderResult};

/// Erasure allowance on top of half the parity count.
const MAX_ERRORS: i32 = 3;

/// Largest parity count the symbology can carry.
const MAX_EC_CODEWORDS: i32 = 512;

/// Hard cap on ambiguity-search iterations. A contract, not a heuristic:
/// it bounds the worst-case cost of one decode call.
const MAX_AMBIGUOUS_TRIES: u32 = 100;

/// Build the codeword matrix from the scanned columns, classify every
/// interior cell, and drive the ambiguity search over the result.
pub fn create_decoder_result(
    detection_result: &mut DetectionResult<'_>,
    options: &DecodeOptions,
) -> Result<DecoderResult, DecodeError> {
    let mut barcode_matrix = create_barcode_matrix(detection_result);
    adjust_codeword_count(detection_result, &mut barcode_matrix)?;

    let row_count = detection_result.barcode_row_count() as usize;
    let column_count = detection_result.barcode_column_count() as usize;
    let mut erasures: Vec<usize> = Vec::new();
    let mut codewords = vec![0i32; row_count * column_count];
    let mut ambiguous_indexes: Vec<usize> = Vec::new();
    let mut ambiguous_values: Vec<Vec<i32>> = Vec::new();
    for row in 0..row_count {
        for column in 0..column_count {
            let values = barcode_matrix[row][column + 1].value();
            let codeword_index = row * column_count + column;
            match values.as_slice() {
                [] => erasures.push(codeword_index),
                [value] => codewords[codeword_index] = *value,
                _ => {
                    ambiguous_indexes.push(codeword_index);
                    ambiguous_values.push(values);
                }
            }
        }
    }

    decode_with_ambiguous_values(
        detection_result.barcode_ec_level(),
        codewords,
        &erasures,
        &ambiguous_indexes,
        &ambiguous_values,
        options,
    )
}

/// Accumulate every codeword observation into a `rows x (columns + 2)`
/// matrix of vote histograms. Observations without a usable row number are
/// dropped silently.
fn create_barcode_matrix(detection_result: &mut DetectionResult<'_>) -> Vec<Vec<BarcodeValue>> {
    let row_count = detection_result.barcode_row_count() as usize;
    let column_count = detection_result.barcode_column_count() as usize + 2;
    let mut matrix = vec![vec![BarcodeValue::new(); column_count]; row_count];

    for (column, result_column) in detection_result.adjusted_columns().iter().enumerate() {
        let Some(result_column) = result_column else {
            continue;
        };
        for codeword in result_column.codewords().iter().flatten() {
            let Some(row_number) = codeword.row_number() else {
                continue;
            };
            if row_number < 0 {
                continue;
            }
            let row_number = row_number as usize;
            if row_number >= matrix.len() {
                // more rows than the barcode metadata allows for
                continue;
            }
            matrix[row_number][column].set_value(codeword.value());
        }
    }
    matrix
}

fn number_of_ec_codewords(ec_level: i32) -> i32 {
    2 << ec_level
}

/// Reconcile the Symbol Length Descriptor at `matrix[0][1]` with the value
/// derived from the recovered dimensions. The derived value is more
/// trustworthy than any single observed codeword, so it always gets a vote.
fn adjust_codeword_count(
    detection_result: &DetectionResult<'_>,
    barcode_matrix: &mut [Vec<BarcodeValue>],
) -> Result<(), DecodeError> {
    let observed = barcode_matrix[0][1].value();
    let calculated = detection_result.barcode_column_count() * detection_result.barcode_row_count()
        - number_of_ec_codewords(detection_result.barcode_ec_level());
    if observed.is_empty() {
        if calculated < 1 || calculated > MAX_CODEWORDS_IN_BARCODE {
            return Err(DecodeError::NotFound);
        }
        barcode_matrix[0][1].set_value(calculated);
    } else if observed[0] != calculated {
        barcode_matrix[0][1].set_value(calculated);
    }
    Ok(())
}

/// Try candidate assignments for ambiguous cells until one passes error
/// correction. The counter vector advances like a little-endian odometer
/// over the candidate arities; only a checksum failure keeps it running.
fn decode_with_ambiguous_values(
    ec_level: i32,
    mut codewords: Vec<i32>,
    erasures: &[usize],
    ambiguous_indexes: &[usize],
    ambiguous_values: &[Vec<i32>],
    options: &DecodeOptions,
) -> Result<DecoderResult, DecodeError> {
    let mut ambiguous_counts = vec![0usize; ambiguous_indexes.len()];
    for tries in 0..MAX_AMBIGUOUS_TRIES {
        for (i, &index) in ambiguous_indexes.iter().enumerate() {
            codewords[index] = ambiguous_values[i][ambiguous_counts[i]];
        }
        match decode_codewords(&mut codewords, ec_level, erasures, options) {
            Err(DecodeError::ChecksumError) => {}
            other => return other,
        }
        if ambiguous_counts.is_empty() {
            return Err(DecodeError::ChecksumError);
        }
        tracing::trace!(tries, "ambiguous codeword assignment failed checksum");
        for i in 0..ambiguous_counts.len() {
            if ambiguous_counts[i] < ambiguous_values[i].len() - 1 {
                ambiguous_counts[i] += 1;
                break;
            }
            ambiguous_counts[i] = 0;
            if i == ambiguous_counts.len() - 1 {
                // odometer overflow: every combination was tried
                return Err(DecodeError::ChecksumError);
            }
        }
    }
    Err(DecodeError::ChecksumError)
}

fn decode_codewords(
    codewords: &mut [i32],
    ec_level: i32,
    erasures: &[usize],
    options: &DecodeOptions,
) -> Result<DecoderResult, DecodeError> {
    if codewords.is_empty() {
        return Err(DecodeError::FormatError);
    }
    let num_ec_codewords = 1 << (ec_level + 1);
    let corrected_errors = correct_errors(codewords, erasures, num_ec_codewords)?;
    verify_codeword_count(codewords, num_ec_codewords)?;
    let mut result = bitstream::decode(codewords, ec_level, options.character_set.as_deref())?;
    result.errors_corrected = corrected_errors;
    result.erasures = erasures.len();
    Ok(result)
}

/// Apply Reed–Solomon over GF(929) in place. Returns the number of
/// corrected errors, erasure repairs excluded.
///
/// Precondition violations (too many erasures, implausible parity count)
/// report `ChecksumError` without invoking the corrector.
pub fn correct_errors(
    codewords: &mut [i32],
    erasures: &[usize],
    num_ec_codewords: i32,
) -> Result<usize, DecodeError> {
    if erasures.len() as i32 > num_ec_codewords / 2 + MAX_ERRORS
        || num_ec_codewords < 0
        || num_ec_codewords > MAX_EC_CODEWORDS
    {
        return Err(DecodeError::ChecksumError);
    }
    ecc::decode(codewords, num_ec_codewords as usize, erasures).ok_or(DecodeError::ChecksumError)
}

/// Validate the Symbol Length Descriptor after correction, deriving it from
/// the stream length when the symbol carries zero.
pub fn verify_codeword_count(
    codewords: &mut [i32],
    num_ec_codewords: i32,
) -> Result<(), DecodeError> {
    if codewords.len() < 4 {
        // count, at least one data codeword, two error correction codewords
        return Err(DecodeError::FormatError);
    }
    let number_of_codewords = codewords[0];
    if number_of_codewords > codewords.len() as i32 {
        return Err(DecodeError::FormatError);
    }
    if number_of_codewords == 0 {
        if num_ec_codewords < codewords.len() as i32 {
            codewords[0] = codewords.len() as i32 - num_ec_codewords;
        } else {
            return Err(DecodeError::FormatError);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::generate_ec;

    fn options() -> DecodeOptions {
        DecodeOptions::new(17, 17)
    }

    /// SLD + "AB" + padding, with parity for the given level appended.
    fn symbol_codewords(ec_level: i32, total: usize) -> Vec<i32> {
        let ec_count = 1usize << (ec_level + 1);
        let data_count = total - ec_count;
        let mut codewords = vec![data_count as i32, 1];
        codewords.extend(std::iter::repeat(900).take(data_count - 2));
        let ec = generate_ec(&codewords, ec_count);
        codewords.extend(ec);
        codewords
    }

    #[test]
    fn test_verify_codeword_count_too_short() {
        let mut codewords = vec![3, 1, 2];
        assert_eq!(
            verify_codeword_count(&mut codewords, 2),
            Err(DecodeError::FormatError)
        );
    }

    #[test]
    fn test_verify_codeword_count_descriptor_too_large() {
        let mut codewords = vec![9, 1, 2, 3];
        assert_eq!(
            verify_codeword_count(&mut codewords, 2),
            Err(DecodeError::FormatError)
        );
    }

    #[test]
    fn test_verify_codeword_count_zero_descriptor_is_derived() {
        let mut codewords = vec![0, 1, 2, 3, 4, 5];
        assert_eq!(verify_codeword_count(&mut codewords, 2), Ok(()));
        assert_eq!(codewords[0], 4);
    }

    #[test]
    fn test_correct_errors_erasure_precondition() {
        // 4 EC codewords allow 4/2 + 3 = 5 erasures, not 6
        let mut codewords = symbol_codewords(1, 10);
        let erasures: Vec<usize> = (0..6).collect();
        assert_eq!(
            correct_errors(&mut codewords, &erasures, 4),
            Err(DecodeError::ChecksumError)
        );
    }

    #[test]
    fn test_ambiguity_search_finds_working_assignment() {
        // level 0 (2 parity codewords) cannot absorb two wrong cells. The
        // wrong candidates are paired so their error terms cancel in the
        // first syndrome, which makes the joint failure unconditional, and
        // the odometer must advance past the all-wrong assignment.
        let codewords = symbol_codewords(0, 6);
        let wrong_1 = (codewords[1] + 7) % 929;
        let wrong_2 = (codewords[2] + 929 - 21) % 929;
        let ambiguous_indexes = [1usize, 2usize];
        let ambiguous_values = vec![vec![wrong_1, codewords[1]], vec![wrong_2, codewords[2]]];
        let result = decode_with_ambiguous_values(
            0,
            codewords,
            &[],
            &ambiguous_indexes,
            &ambiguous_values,
            &options(),
        )
        .expect("an assignment passes the checksum");
        assert_eq!(result.text, "AB");
        assert!(result.errors_corrected <= 1);
    }

    #[test]
    fn test_ambiguity_search_terminates_when_nothing_fits() {
        let mut codewords = symbol_codewords(0, 6);
        // an uncorrectable syndrome-cancelling error pair stays in place
        // whatever the odometer assigns, so every combination fails and the
        // search ends on odometer overflow
        codewords[1] = (codewords[1] + 7) % 929;
        codewords[2] = (codewords[2] + 929 - 21) % 929;
        let ambiguous_indexes = [3usize];
        let ambiguous_values = vec![vec![codewords[3]]];
        assert_eq!(
            decode_with_ambiguous_values(
                0,
                codewords,
                &[],
                &ambiguous_indexes,
                &ambiguous_values,
                &options(),
            ),
            Err(DecodeError::ChecksumError)
        );
    }
}
