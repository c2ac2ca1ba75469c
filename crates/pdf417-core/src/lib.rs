//! PDF417 scanning decoder.
//!
//! Takes a pre-binarized bit grid together with the four approximate corner
//! points of a detected symbol and produces the decoded message plus
//! diagnostics. The pipeline:
//!
//! 1. **Bounding box**: clip the corner points to the image, substituting a
//!    missing side with the image edge.
//! 2. **Row indicators**: walk the leftmost and rightmost codeword columns,
//!    vote their values into symbol metadata (rows, columns, EC level) and
//!    extend the box over rows the indicators show to be missing.
//! 3. **Interior scan**: detect each codeword from a start column predicted
//!    by its neighbors, adapting the expected codeword width as evidence
//!    accumulates.
//! 4. **Matrix and correction**: reconcile row numbers, vote conflicting
//!    observations per cell, and run Reed–Solomon over GF(929), backtracking
//!    over ambiguous cells when the checksum fails.
//!
//! # Quick start
//!
//! ```
//! use pdf417_core::{BitMatrix, DecodeOptions, ScanningDecoder};
//! use pdf417_core::test_utils;
//!
//! let symbol = test_utils::generate_symbol("HELLO", 2, 2, 3, 9);
//! let image = BitMatrix::new(&symbol.data, symbol.width, symbol.height, symbol.width).unwrap();
//!
//! let mut decoder = ScanningDecoder::new();
//! let options = DecodeOptions::new(symbol.codeword_width, symbol.codeword_width);
//! let result = decoder.decode(&image, &symbol.corners, &options).unwrap();
//! assert_eq!(result.text, "HELLO");
//! ```

use std::fmt;

use bumpalo::Bump;

pub mod bitstream;
pub mod bounds;
pub mod codebook;
pub mod codeword;
pub mod column;
pub mod config;
pub mod decoder;
pub mod detection;
pub mod ecc;
pub mod image;
pub mod metadata;
pub mod scanner;
pub mod test_utils;

pub use config::DecodeOptions;
pub use image::{BitMatrix, CornerPoints, Point};

use bounds::BoundingBox;
use column::{ColumnRole, DetectionResultColumn};
use detection::DetectionResult;

/// Why a decode attempt failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Geometry or metadata could not be recovered. Never indicates data
    /// corruption.
    NotFound,
    /// The recovered codeword matrix is structurally invalid.
    FormatError,
    /// Error correction failed to converge.
    ChecksumError,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no decodable symbol found"),
            Self::FormatError => write!(f, "symbol structure is invalid"),
            Self::ChecksumError => write!(f, "error correction failed"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// A decoded message with its correction diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderResult {
    /// Decoded text, byte segments interpreted through the active ECI
    /// character set (Latin-1 by default).
    pub text: String,
    /// The payload as raw bytes.
    pub bytes: Vec<u8>,
    /// Codewords repaired by Reed-Solomon, known erasures excluded.
    pub errors_corrected: usize,
    /// Codeword cells with no usable observation.
    pub erasures: usize,
    /// Error correction level of the symbol, `0..=8`.
    pub ec_level: u8,
}

/// Reusable decoder. Owns the scratch arena that backs per-call column
/// storage; all other state lives and dies within one [`Self::decode`]
/// call.
pub struct ScanningDecoder {
    arena: Bump,
}

impl ScanningDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self { arena: Bump::new() }
    }

    /// Decode one symbol. `corners` may omit either vertical edge; width
    /// bounds in `options` are only a starting estimate.
    pub fn decode(
        &mut self,
        image: &BitMatrix<'_>,
        corners: &CornerPoints,
        options: &DecodeOptions,
    ) -> Result<DecoderResult, DecodeError> {
        self.arena.reset();
        decode_in(&self.arena, image, corners, options)
    }
}

impl Default for ScanningDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot convenience wrapper around [`ScanningDecoder`].
pub fn decode(
    image: &BitMatrix<'_>,
    corners: &CornerPoints,
    options: &DecodeOptions,
) -> Result<DecoderResult, DecodeError> {
    ScanningDecoder::new().decode(image, corners, options)
}

fn decode_in<'a>(
    arena: &'a Bump,
    image: &BitMatrix<'_>,
    corners: &CornerPoints,
    options: &DecodeOptions,
) -> Result<DecoderResult, DecodeError> {
    let mut bounding_box = BoundingBox::new(
        image.width,
        image.height,
        corners.top_left,
        corners.bottom_left,
        corners.top_right,
        corners.bottom_right,
    )
    .ok_or(DecodeError::NotFound)?;

    let mut min_codeword_width = options.min_codeword_width;
    let mut max_codeword_width = options.max_codeword_width;
    let mut left_column: Option<DetectionResultColumn<'a>> = None;
    let mut right_column: Option<DetectionResultColumn<'a>> = None;
    let mut detection_result: Option<DetectionResult<'a>> = None;

    // Two passes at most: when the indicators reveal rows above or below
    // the initial box, adopt the extended box and rebuild them once.
    for pass in 0..2 {
        if let Some(top_left) = corners.top_left {
            left_column = Some(scanner::row_indicator_column(
                arena,
                image,
                &bounding_box,
                top_left,
                true,
                min_codeword_width,
                max_codeword_width,
            ));
        }
        if let Some(top_right) = corners.top_right {
            right_column = Some(scanner::row_indicator_column(
                arena,
                image,
                &bounding_box,
                top_right,
                false,
                min_codeword_width,
                max_codeword_width,
            ));
        }
        if left_column.is_none() && right_column.is_none() {
            return Err(DecodeError::NotFound);
        }
        let metadata = scanner::barcode_metadata(left_column.as_mut(), right_column.as_mut())
            .ok_or(DecodeError::NotFound)?;
        let left_box = scanner::adjust_bounding_box(left_column.as_mut())?;
        let right_box = scanner::adjust_bounding_box(right_column.as_mut())?;
        let merged = BoundingBox::merge(left_box, right_box);
        if pass == 0 {
            if let Some(merged) = merged {
                if merged.min_y() < bounding_box.min_y() || merged.max_y() > bounding_box.max_y() {
                    tracing::debug!(
                        min_y = merged.min_y(),
                        max_y = merged.max_y(),
                        "adopting vertically extended bounding box"
                    );
                    bounding_box = merged;
                    continue;
                }
            }
        }
        detection_result = Some(DetectionResult::new(metadata, bounding_box));
        break;
    }
    let mut detection_result = detection_result.ok_or(DecodeError::NotFound)?;

    let max_barcode_column = detection_result.barcode_column_count() + 1;
    detection_result.set_column(0, left_column);
    detection_result.set_column(max_barcode_column as usize, right_column);

    let left_to_right = detection_result.column(0).is_some();
    for barcode_column_count in 1..=max_barcode_column {
        let barcode_column = if left_to_right {
            barcode_column_count
        } else {
            max_barcode_column - barcode_column_count
        };
        if detection_result.column(barcode_column).is_some() {
            // the opposite row indicator, already decoded
            continue;
        }
        let role = if barcode_column == 0 {
            ColumnRole::LeftIndicator
        } else if barcode_column == max_barcode_column {
            ColumnRole::RightIndicator
        } else {
            ColumnRole::Interior
        };
        detection_result.set_column(
            barcode_column as usize,
            Some(DetectionResultColumn::new_in(arena, bounding_box, role)),
        );

        let mut previous_start_column = -1;
        for image_row in bounding_box.min_y()..=bounding_box.max_y() {
            let mut start_column =
                scanner::get_start_column(&detection_result, barcode_column, image_row, left_to_right);
            if start_column < 0 || start_column > bounding_box.max_x() {
                if previous_start_column == -1 {
                    continue;
                }
                start_column = previous_start_column;
            }
            if let Some(codeword) = scanner::detect_codeword(
                image,
                bounding_box.min_x(),
                bounding_box.max_x(),
                left_to_right,
                start_column,
                image_row,
                min_codeword_width,
                max_codeword_width,
            ) {
                if let Some(column) = detection_result.column_mut(barcode_column) {
                    column.set_codeword(image_row, codeword);
                }
                previous_start_column = start_column;
                min_codeword_width = min_codeword_width.min(codeword.width());
                max_codeword_width = max_codeword_width.max(codeword.width());
            }
        }
    }

    decoder::create_decoder_result(&mut detection_result, options)
}
