//! Stride-aware bit-grid view for zero-copy ingestion.

/// A read-only view of a pre-binarized image: one byte per pixel, any
/// non-zero byte is a black module (bar). `stride` is the row pitch in
/// bytes and may exceed `width` when the producer pads its rows.
pub struct BitMatrix<'a> {
    pub data: &'a [u8],
    pub width: usize,
    pub height: usize,
    pub stride: usize,
}

impl<'a> BitMatrix<'a> {
    /// Create a view over `data`, checking that every grid row lies inside
    /// the buffer.
    pub fn new(
        data: &'a [u8],
        width: usize,
        height: usize,
        stride: usize,
    ) -> Result<Self, String> {
        if stride < width {
            return Err(format!(
                "row pitch {} is smaller than the grid width {}",
                stride, width
            ));
        }
        let last_row_end = match height {
            0 => 0,
            h => (h - 1) * stride + width,
        };
        if data.len() < last_row_end {
            return Err(format!(
                "a {}x{} bit grid with row pitch {} needs {} bytes, buffer holds {}",
                width,
                height,
                stride,
                last_row_end,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Pixel at `(x, y)`; `true` is a black module.
    #[inline(always)]
    pub fn get(&self, x: i32, y: i32) -> bool {
        assert!(
            x >= 0 && (x as usize) < self.width,
            "pixel column {} outside the grid",
            x
        );
        assert!(
            y >= 0 && (y as usize) < self.height,
            "pixel row {} outside the grid",
            y
        );
        self.data[y as usize * self.stride + x as usize] != 0
    }
}

/// A sub-pixel position in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The four approximate corner points of a detected symbol, as reported by a
/// finder-pattern detector. Each corner may be absent; decoding can proceed
/// as long as one full vertical edge (left or right) is present.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CornerPoints {
    pub top_left: Option<Point>,
    pub bottom_left: Option<Point>,
    pub top_right: Option<Point>,
    pub bottom_right: Option<Point>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_pitch_padding() {
        let data = vec![
            1, 0, 1, 9, // row 0 + one pad byte
            0, 1, 0, 9, // row 1 + one pad byte
        ];
        let grid = BitMatrix::new(&data, 3, 2, 4).unwrap();
        assert!(grid.get(0, 0));
        assert!(!grid.get(1, 0));
        assert!(grid.get(1, 1));
        assert!(!grid.get(2, 1));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let data = vec![1, 0, 1];
        assert!(BitMatrix::new(&data, 2, 2, 2).is_err());
        assert!(BitMatrix::new(&data, 2, 1, 1).is_err());
    }
}
