//! Cohen-Sutherland line clipping against a surface clip rectangle.
//!
//! The outcode layout (rectangle corners inclusive):
//!
//! ```text
//!        |        |
//!  1001  |  1000  | 1010
//!        |        |
//! -------+--------+-------- top
//!        |        |
//!  0001  |  0000  | 0010
//!        |        |
//! -------+--------+-------- bottom
//!        |        |
//!  0101  |  0100  | 0110
//!        |        |
//!      left     right
//! ```
//!
//! Intersections are computed with a single-precision slope and truncated
//! towards zero, so endpoints moved onto an edge may land one pixel short
//! of the exact intersection.

use crate::basics::RectI;

// ============================================================================
// Outcodes
// ============================================================================

pub const CLIP_LEFT: u32 = 1;
pub const CLIP_RIGHT: u32 = 2;
pub const CLIP_BOTTOM: u32 = 4;
pub const CLIP_TOP: u32 = 8;

/// Outcode of (x, y) against `clip`. At most one horizontal and one
/// vertical bit is set.
#[inline]
pub fn outcode(x: i32, y: i32, clip: &RectI) -> u32 {
    let mut code = 0;
    if x < clip.x1 {
        code |= CLIP_LEFT;
    } else if x > clip.x2 {
        code |= CLIP_RIGHT;
    }
    if y < clip.y1 {
        code |= CLIP_TOP;
    } else if y > clip.y2 {
        code |= CLIP_BOTTOM;
    }
    code
}

// ============================================================================
// Line clipping
// ============================================================================

/// Clip the segment (x1, y1)-(x2, y2) to `clip` in place.
///
/// Returns `false` when nothing of the segment is visible. The endpoints
/// may come back swapped.
pub fn clip_line(clip: &RectI, x1: &mut i32, y1: &mut i32, x2: &mut i32, y2: &mut i32) -> bool {
    if !clip.is_valid() {
        return false;
    }
    loop {
        let mut c1 = outcode(*x1, *y1, clip);
        let c2 = outcode(*x2, *y2, clip);
        if c1 | c2 == 0 {
            return true;
        }
        if c1 & c2 != 0 {
            return false;
        }
        if c1 == 0 {
            std::mem::swap(x1, x2);
            std::mem::swap(y1, y2);
            c1 = c2;
        }
        let m = if *x2 != *x1 {
            (*y2 - *y1) as f32 / (*x2 - *x1) as f32
        } else {
            1.0
        };
        if c1 & CLIP_LEFT != 0 {
            *y1 += ((clip.x1 - *x1) as f32 * m) as i32;
            *x1 = clip.x1;
        } else if c1 & CLIP_RIGHT != 0 {
            *y1 += ((clip.x2 - *x1) as f32 * m) as i32;
            *x1 = clip.x2;
        } else if c1 & CLIP_BOTTOM != 0 {
            if *x2 != *x1 {
                *x1 += ((clip.y2 - *y1) as f32 / m) as i32;
            }
            *y1 = clip.y2;
        } else if c1 & CLIP_TOP != 0 {
            if *x2 != *x1 {
                *x1 += ((clip.y1 - *y1) as f32 / m) as i32;
            }
            *y1 = clip.y1;
        }
    }
}
