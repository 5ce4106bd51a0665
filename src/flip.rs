//! Mirroring and band removal. Both are exact pixel moves.

use crate::error::Result;
use crate::surface::Surface;

/// Mirror `src` horizontally (`flip_x`) and/or vertically (`flip_y`)
/// into a new surface.
pub fn flip(src: &Surface, flip_x: bool, flip_y: bool) -> Result<Surface> {
    let mut dst = src.new_like(src.width(), src.height())?;
    let bpp = src.bytes_per_pixel();
    let h = src.height();
    let _lock = src.lock();

    for y in 0..h {
        let sy = if flip_y { h - 1 - y } else { y };
        let srow = src.row(sy);
        let mut drow = dst.row_mut(y);
        if flip_x {
            for (d, s) in drow.chunks_exact_mut(bpp).zip(srow.chunks_exact(bpp).rev()) {
                d.copy_from_slice(s);
            }
        } else {
            drow.copy_from_slice(&srow);
        }
    }
    Ok(dst)
}

/// Remove the band of columns `x..x + width` and rows `y..y + height`,
/// closing up what is left.
///
/// The band is clamped to the surface first; a band entirely outside
/// removes nothing.
pub fn chop(src: &Surface, x: i32, y: i32, width: i32, height: i32) -> Result<Surface> {
    let (sw, sh) = (src.width() as i32, src.height() as i32);
    let (mut x, mut y, mut width, mut height) = (x, y, width.max(0), height.max(0));
    if x + width > sw {
        width = (sw - x).max(0).min(sw);
    }
    if y + height > sh {
        height = (sh - y).max(0).min(sh);
    }
    if x < 0 {
        width = (width + x).max(0);
        x = 0;
    }
    if y < 0 {
        height = (height + y).max(0);
        y = 0;
    }

    let mut dst = src.new_like((sw - width) as u32, (sh - height) as u32)?;
    let bpp = src.bytes_per_pixel();
    let _lock = src.lock();

    let kept_rows = (0..sh).filter(|&r| r < y || r >= y + height);
    for (dy, sy) in kept_rows.enumerate() {
        let srow = src.row(sy as u32);
        let mut drow = dst.row_mut(dy as u32);
        let left = x as usize * bpp;
        let right = (x + width) as usize * bpp;
        drow[..left].copy_from_slice(&srow[..left]);
        drow[left..].copy_from_slice(&srow[right..]);
    }
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::PixelFormat;
    use quickcheck_macros::quickcheck;

    fn numbered(w: u32, h: u32, format: PixelFormat) -> Surface {
        let mut s = Surface::new(w, h, format).unwrap();
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                s.set_at(x, y, (y * 10 + x) as u32).unwrap();
            }
        }
        s
    }

    fn values(s: &Surface) -> Vec<Vec<u32>> {
        (0..s.height() as i32)
            .map(|y| (0..s.width() as i32).map(|x| s.get_at(x, y).unwrap()).collect())
            .collect()
    }

    #[test]
    fn test_flip_x() {
        let s = numbered(3, 2, PixelFormat::rgb888());
        let f = flip(&s, true, false).unwrap();
        assert_eq!(values(&f), vec![vec![2, 1, 0], vec![12, 11, 10]]);
    }

    #[test]
    fn test_flip_y() {
        let s = numbered(2, 3, PixelFormat::rgb565());
        let f = flip(&s, false, true).unwrap();
        assert_eq!(values(&f), vec![vec![20, 21], vec![10, 11], vec![0, 1]]);
    }

    #[test]
    fn test_flip_none_copies() {
        let s = numbered(4, 4, PixelFormat::argb8888());
        assert!(flip(&s, false, false).unwrap().same_pixels(&s));
    }

    #[test]
    fn test_chop_middle_band() {
        let s = numbered(4, 4, PixelFormat::argb8888());
        let c = chop(&s, 1, 1, 2, 1).unwrap();
        assert_eq!(values(&c), vec![vec![0, 3], vec![20, 23], vec![30, 33]]);
    }

    #[test]
    fn test_chop_clamps() {
        let s = numbered(4, 3, PixelFormat::rgb888());
        // Starts left of the surface: removes columns 0 and 1 only.
        let c = chop(&s, -2, 0, 4, 0).unwrap();
        assert_eq!(values(&c), vec![vec![2, 3], vec![12, 13], vec![22, 23]]);
        // Runs past the bottom edge.
        let c = chop(&s, 0, 2, 0, 10).unwrap();
        assert_eq!((c.width(), c.height()), (4, 2));
        // Entirely outside.
        let c = chop(&s, 10, 10, 3, 3).unwrap();
        assert!(c.same_pixels(&s));
    }

    #[quickcheck]
    fn flip_twice_is_identity(w: u8, h: u8, fx: bool, fy: bool) -> bool {
        let s = numbered(w as u32 % 11 + 1, h as u32 % 9 + 1, PixelFormat::rgb888());
        let once = flip(&s, fx, fy).unwrap();
        flip(&once, fx, fy).unwrap().same_pixels(&s)
    }
}
