//! A single observed 17-module symbol and its bucket arithmetic.

/// Number of bar/space runs in one codeword: 4 bars and 4 spaces.
pub const BARS_IN_MODULE: usize = 8;

/// Width of one codeword in modules.
pub const MODULES_IN_CODEWORD: i32 = 17;

/// Ordered run lengths of one codeword, bars at even indices.
pub type ModuleBitCount = [i32; BARS_IN_MODULE];

/// Bucket (row cluster) number of a run-length sequence, in `[0, 8]`.
/// Codewords of barcode row `r` fall in bucket `(r % 3) * 3`.
#[inline]
#[must_use]
pub fn bucket_of(counts: &ModuleBitCount) -> i32 {
    (counts[0] - counts[2] + counts[4] - counts[6] + 9).rem_euclid(9)
}

/// Expand a 17-bit symbol pattern back into its 8 run lengths.
///
/// Only valid for patterns with exactly 8 runs (every codebook entry).
#[must_use]
pub fn bit_count_of_pattern(pattern: u32) -> ModuleBitCount {
    let mut result = [0i32; BARS_IN_MODULE];
    let mut previous = 0u32;
    let mut i = BARS_IN_MODULE as i32 - 1;
    let mut pattern = pattern;
    loop {
        if (pattern & 0x1) != previous {
            previous = pattern & 0x1;
            i -= 1;
            if i < 0 {
                break;
            }
        }
        result[i as usize] += 1;
        pattern >>= 1;
    }
    result
}

/// Bucket number of a 17-bit symbol pattern.
#[must_use]
pub fn bucket_of_pattern(pattern: u32) -> i32 {
    bucket_of(&bit_count_of_pattern(pattern))
}

/// One decoded codeword observation at a particular image row.
///
/// `start_x`/`end_x` are image columns (half-open). The barcode row number is
/// not known at detection time; it is assigned later from the row-indicator
/// columns and neighboring observations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Codeword {
    start_x: i32,
    end_x: i32,
    bucket: i32,
    value: i32,
    row_number: Option<i32>,
}

impl Codeword {
    #[must_use]
    pub fn new(start_x: i32, end_x: i32, bucket: i32, value: i32) -> Self {
        Self {
            start_x,
            end_x,
            bucket,
            value,
            row_number: None,
        }
    }

    #[must_use]
    pub fn start_x(&self) -> i32 {
        self.start_x
    }

    #[must_use]
    pub fn end_x(&self) -> i32 {
        self.end_x
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.end_x - self.start_x
    }

    #[must_use]
    pub fn bucket(&self) -> i32 {
        self.bucket
    }

    #[must_use]
    pub fn value(&self) -> i32 {
        self.value
    }

    #[must_use]
    pub fn row_number(&self) -> Option<i32> {
        self.row_number
    }

    pub fn set_row_number(&mut self, row_number: Option<i32>) {
        self.row_number = row_number;
    }

    /// A row number fits this codeword when the bucket identifies the row's
    /// cluster: bucket `(row % 3) * 3`.
    #[must_use]
    pub fn is_valid_row_number(&self, row_number: i32) -> bool {
        self.bucket == (row_number % 3) * 3
    }

    #[must_use]
    pub fn has_valid_row_number(&self) -> bool {
        self.row_number
            .is_some_and(|row| self.is_valid_row_number(row))
    }

    /// Derive the row number of a row-indicator codeword from its own value
    /// and bucket.
    pub fn set_row_number_as_row_indicator(&mut self) {
        self.row_number = Some((self.value / 30) * 3 + self.bucket / 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_of_start_like_runs() {
        // 8-1-1-1-1-1-1-3: (8 - 1 + 1 - 1 + 9) % 9 = 7
        assert_eq!(bucket_of(&[8, 1, 1, 1, 1, 1, 1, 3]), 7);
        // negative intermediate sums wrap correctly
        assert_eq!(bucket_of(&[1, 6, 1, 6, 1, 1, 1, 0]), (1 - 1 + 1 - 1 + 9) % 9);
    }

    #[test]
    fn test_bit_count_round_trip() {
        // widths [2,1,3,1,4,1,4,1] -> pattern -> widths again
        let widths = [2, 1, 3, 1, 4, 1, 4, 1];
        let mut pattern = 0u32;
        for (i, &w) in widths.iter().enumerate() {
            for _ in 0..w {
                pattern = (pattern << 1) | u32::from(i % 2 == 0);
            }
        }
        assert_eq!(bit_count_of_pattern(pattern), widths);
    }

    #[test]
    fn test_row_indicator_row_number() {
        // value 63 -> barcode row band 2, bucket 3 -> row 2*3 + 1 = 7
        let mut cw = Codeword::new(0, 17, 3, 63);
        cw.set_row_number_as_row_indicator();
        assert_eq!(cw.row_number(), Some(7));
        assert!(cw.has_valid_row_number());
        assert!(!cw.is_valid_row_number(6));
    }
}
