//! Axis-aligned region of interest for one symbol, clipped to the image.

use crate::image::Point;

/// Bounding box of a symbol, kept as four corner points plus the derived
/// extents. A missing side is substituted with the image edge on that side;
/// the substituted corners are what `add_missing_rows` moves when leading or
/// trailing barcode rows turn out to lie outside the initial box.
#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    img_width: usize,
    img_height: usize,
    top_left: Point,
    bottom_left: Point,
    top_right: Point,
    bottom_right: Point,
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl BoundingBox {
    /// Build a box from up to four corner points. Fails when an entire
    /// vertical edge (left or right) is missing, or when the points collapse
    /// to an empty region.
    #[must_use]
    pub fn new(
        img_width: usize,
        img_height: usize,
        top_left: Option<Point>,
        bottom_left: Option<Point>,
        top_right: Option<Point>,
        bottom_right: Option<Point>,
    ) -> Option<Self> {
        if img_width == 0 || img_height == 0 {
            return None;
        }
        let left_missing = top_left.is_none() || bottom_left.is_none();
        let right_missing = top_right.is_none() || bottom_right.is_none();
        if left_missing && right_missing {
            return None;
        }
        let (top_left, bottom_left, top_right, bottom_right) = if left_missing {
            let tr = top_right?;
            let br = bottom_right?;
            (Point::new(0.0, tr.y), Point::new(0.0, br.y), tr, br)
        } else if right_missing {
            let tl = top_left?;
            let bl = bottom_left?;
            let edge = img_width as f64 - 1.0;
            (tl, bl, Point::new(edge, tl.y), Point::new(edge, bl.y))
        } else {
            (top_left?, bottom_left?, top_right?, bottom_right?)
        };

        let clamp_x = |v: f64| (v as i32).clamp(0, img_width as i32 - 1);
        let clamp_y = |v: f64| (v as i32).clamp(0, img_height as i32 - 1);
        let min_x = clamp_x(top_left.x.min(bottom_left.x));
        let max_x = clamp_x(top_right.x.max(bottom_right.x));
        let min_y = clamp_y(top_left.y.min(top_right.y));
        let max_y = clamp_y(bottom_left.y.max(bottom_right.y));
        if min_x > max_x || min_y > max_y {
            return None;
        }
        Some(Self {
            img_width,
            img_height,
            top_left,
            bottom_left,
            top_right,
            bottom_right,
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Smallest box containing both inputs; when either is absent the other
    /// is returned unchanged.
    #[must_use]
    pub fn merge(left: Option<BoundingBox>, right: Option<BoundingBox>) -> Option<BoundingBox> {
        match (left, right) {
            (Some(l), Some(r)) => BoundingBox::new(
                l.img_width,
                l.img_height,
                Some(l.top_left),
                Some(l.bottom_left),
                Some(r.top_right),
                Some(r.bottom_right),
            ),
            (l, None) => l,
            (None, r) => r,
        }
    }

    /// Extend the box vertically to cover barcode rows the row-indicator
    /// column shows to be missing above or below the detected region. Only
    /// the indicator's own side moves; the extension is clipped to the image.
    #[must_use]
    pub fn add_missing_rows(
        &self,
        missing_start_rows: i32,
        missing_end_rows: i32,
        is_left: bool,
    ) -> Option<BoundingBox> {
        let mut top_left = self.top_left;
        let mut bottom_left = self.bottom_left;
        let mut top_right = self.top_right;
        let mut bottom_right = self.bottom_right;

        if missing_start_rows > 0 {
            let top = if is_left { self.top_left } else { self.top_right };
            let new_min_y = (top.y as i32 - missing_start_rows).max(0);
            let new_top = Point::new(top.x, f64::from(new_min_y));
            if is_left {
                top_left = new_top;
            } else {
                top_right = new_top;
            }
        }
        if missing_end_rows > 0 {
            let bottom = if is_left {
                self.bottom_left
            } else {
                self.bottom_right
            };
            let new_max_y = (bottom.y as i32 + missing_end_rows).min(self.img_height as i32 - 1);
            let new_bottom = Point::new(bottom.x, f64::from(new_max_y));
            if is_left {
                bottom_left = new_bottom;
            } else {
                bottom_right = new_bottom;
            }
        }
        BoundingBox::new(
            self.img_width,
            self.img_height,
            Some(top_left),
            Some(bottom_left),
            Some(top_right),
            Some(bottom_right),
        )
    }

    #[must_use]
    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    #[must_use]
    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    #[must_use]
    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    #[must_use]
    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    #[must_use]
    pub fn top_left(&self) -> Point {
        self.top_left
    }

    #[must_use]
    pub fn bottom_left(&self) -> Point {
        self.bottom_left
    }

    #[must_use]
    pub fn top_right(&self) -> Point {
        self.top_right
    }

    #[must_use]
    pub fn bottom_right(&self) -> Point {
        self.bottom_right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_left_side_substituted() {
        let b = BoundingBox::new(
            100,
            50,
            None,
            None,
            Some(Point::new(80.0, 5.0)),
            Some(Point::new(80.0, 40.0)),
        )
        .unwrap();
        assert_eq!(b.min_x(), 0);
        assert_eq!(b.max_x(), 80);
        assert_eq!(b.min_y(), 5);
        assert_eq!(b.max_y(), 40);
    }

    #[test]
    fn test_both_sides_missing_fails() {
        assert!(BoundingBox::new(100, 50, None, None, None, None).is_none());
        assert!(
            BoundingBox::new(100, 50, Some(Point::new(1.0, 1.0)), None, None, None).is_none()
        );
    }

    #[test]
    fn test_add_missing_rows_clips_to_image() {
        let b = BoundingBox::new(
            100,
            50,
            Some(Point::new(10.0, 5.0)),
            Some(Point::new(10.0, 44.0)),
            Some(Point::new(90.0, 5.0)),
            Some(Point::new(90.0, 44.0)),
        )
        .unwrap();
        let extended = b.add_missing_rows(20, 20, true).unwrap();
        assert_eq!(extended.min_y(), 0);
        assert_eq!(extended.max_y(), 49);
        // the right side did not move
        assert_eq!(extended.top_right().y as i32, 5);
    }

    #[test]
    fn test_merge_prefers_present_box() {
        let b = BoundingBox::new(
            100,
            50,
            Some(Point::new(10.0, 5.0)),
            Some(Point::new(10.0, 44.0)),
            Some(Point::new(90.0, 5.0)),
            Some(Point::new(90.0, 44.0)),
        )
        .unwrap();
        let merged = BoundingBox::merge(Some(b), None).unwrap();
        assert_eq!(merged.min_x(), b.min_x());
        assert!(BoundingBox::merge(None, None).is_none());
    }
}
