//! Foundation types: C-style rounding and the inclusive-corner rectangle.
//!
//! Everything else in the crate measures clip regions, dirty areas and
//! sample windows with [`RectI`].

// ============================================================================
// Rounding
// ============================================================================

/// Round to nearest with ties to even, like C `lrint` under the default
/// floating point environment.
#[inline]
pub fn lrint(v: f64) -> i32 {
    let f = v.floor();
    let diff = v - f;
    let up = diff > 0.5 || (diff == 0.5 && (f as i64) & 1 != 0);
    (if up { f + 1.0 } else { f }) as i32
}

// ============================================================================
// Rect
// ============================================================================

/// A rectangle defined by two inclusive corner points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Normalize so that x1 <= x2 and y1 <= y2, swapping if needed.
    pub fn normalize(&mut self) -> &Self {
        if self.x1 > self.x2 {
            core::mem::swap(&mut self.x1, &mut self.x2);
        }
        if self.y1 > self.y2 {
            core::mem::swap(&mut self.y1, &mut self.y2);
        }
        self
    }

    /// Clip this rectangle to the intersection with `r`.
    /// Returns `true` if the result is a valid (non-empty) rectangle.
    pub fn clip(&mut self, r: &Self) -> bool {
        if self.x2 > r.x2 {
            self.x2 = r.x2;
        }
        if self.y2 > r.y2 {
            self.y2 = r.y2;
        }
        if self.x1 < r.x1 {
            self.x1 = r.x1;
        }
        if self.y1 < r.y1 {
            self.y1 = r.y1;
        }
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns `true` if the rectangle is valid (non-empty).
    pub fn is_valid(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }

    /// Returns `true` if the point (x, y) is inside the rectangle.
    pub fn hit_test(&self, x: T, y: T) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }
}

/// Rectangle with `i32` coordinates.
pub type RectI = Rect<i32>;

impl RectI {
    /// Build from an origin and a size, the way surfaces describe areas.
    /// A zero width or height yields an invalid (empty) rectangle.
    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(x, y, x + w - 1, y + h - 1)
    }

    /// The empty rectangle.
    pub fn empty() -> Self {
        Self::new(0, 0, -1, -1)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        if self.is_valid() {
            self.x2 - self.x1 + 1
        } else {
            0
        }
    }

    #[inline]
    pub fn height(&self) -> i32 {
        if self.is_valid() {
            self.y2 - self.y1 + 1
        } else {
            0
        }
    }

    /// Intersection of two rectangles; empty if they do not overlap.
    pub fn intersect(&self, r: &Self) -> Self {
        let mut out = *self;
        if out.clip(r) {
            out
        } else {
            Self::empty()
        }
    }
}

impl Default for RectI {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lrint_ties_to_even() {
        assert_eq!(lrint(0.5), 0);
        assert_eq!(lrint(1.5), 2);
        assert_eq!(lrint(2.5), 2);
        assert_eq!(lrint(-0.5), 0);
        assert_eq!(lrint(-1.5), -2);
        assert_eq!(lrint(2.4999), 2);
        assert_eq!(lrint(7.07), 7);
    }

    #[test]
    fn test_rect_from_xywh() {
        let r = RectI::from_xywh(2, 3, 4, 5);
        assert_eq!(r, RectI::new(2, 3, 5, 7));
        assert_eq!(r.width(), 4);
        assert_eq!(r.height(), 5);
        assert!(!RectI::from_xywh(0, 0, 0, 5).is_valid());
    }

    #[test]
    fn test_rect_clip() {
        let mut r = RectI::new(-5, -5, 20, 20);
        assert!(r.clip(&RectI::new(0, 0, 9, 9)));
        assert_eq!(r, RectI::new(0, 0, 9, 9));

        let mut r = RectI::new(15, 15, 20, 20);
        assert!(!r.clip(&RectI::new(0, 0, 9, 9)));
    }

    #[test]
    fn test_rect_normalize_and_hit() {
        let mut r = RectI::new(5, 6, 1, 2);
        r.normalize();
        assert_eq!(r, RectI::new(1, 2, 5, 6));
        assert!(r.hit_test(1, 2));
        assert!(r.hit_test(5, 6));
        assert!(!r.hit_test(6, 6));
    }

    #[test]
    fn test_rect_intersect() {
        let a = RectI::new(0, 0, 9, 9);
        let b = RectI::new(5, 5, 14, 14);
        assert_eq!(a.intersect(&b), RectI::new(5, 5, 9, 9));
        let c = RectI::new(20, 20, 30, 30);
        assert!(!a.intersect(&c).is_valid());
        assert_eq!(a.intersect(&c).width(), 0);
    }
}
