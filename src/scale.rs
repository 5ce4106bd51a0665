//! Nearest-neighbour scaling.
//!
//! Sampling uses 16.16 steps centred on each destination pixel:
//! `step = (src << 16) / dst`, first sample at `step / 2`.

use log::trace;

use crate::error::{Error, Result};
use crate::surface::Surface;

// ============================================================================
// Stretch
// ============================================================================

/// Copy `src` onto the whole of `dst` by nearest-neighbour sampling.
/// Both surfaces have the same bytes per pixel and non-zero size.
fn stretch_nearest(src: &Surface, dst: &mut Surface) {
    let bpp = src.bytes_per_pixel();
    let (sw, sh) = (src.width() as u64, src.height() as u64);
    let (dw, dh) = (dst.width(), dst.height());
    let step_x = (sw << 16) / dw as u64;
    let step_y = (sh << 16) / dh as u64;

    let mut pos_y = step_y / 2;
    for y in 0..dh {
        let srow = src.row((pos_y >> 16) as u32);
        pos_y += step_y;
        let mut drow = dst.row_mut(y);
        let mut pos_x = step_x / 2;
        for d in drow.chunks_exact_mut(bpp) {
            let sx = (pos_x >> 16) as usize * bpp;
            d.copy_from_slice(&srow[sx..sx + bpp]);
            pos_x += step_x;
        }
    }
}

fn check_target(width: i32, height: i32) -> Result<()> {
    if width < 0 || height < 0 {
        return Err(Error::invalid(format!("cannot scale to negative size {width}x{height}")));
    }
    Ok(())
}

// ============================================================================
// Public API
// ============================================================================

/// Scale `src` to `width` x `height` into a new surface of the same format.
pub fn scale(src: &Surface, width: i32, height: i32) -> Result<Surface> {
    check_target(width, height)?;
    let mut dst = src.new_like(width as u32, height as u32)?;
    scale_into(src, &mut dst)?;
    Ok(dst)
}

/// Scale `src` onto the whole of `dst`.
///
/// The formats must be compatible (same bytes per pixel and RGB masks);
/// differing alpha masks are accepted and the raw pixel values copied.
pub fn scale_into(src: &Surface, dst: &mut Surface) -> Result<()> {
    if !src.format().is_compatible(dst.format()) {
        return Err(Error::incompatible("source and destination formats differ"));
    }
    if src.shares_memory_with(dst) {
        return Err(Error::incompatible("destination overlaps the source"));
    }
    if src.width() == 0 || src.height() == 0 || dst.width() == 0 || dst.height() == 0 {
        return Ok(());
    }
    let _src_lock = src.lock();
    let _dst_lock = dst.lock();
    if src.width() == dst.width() && src.height() == dst.height() {
        trace!("scale: same size, row copy");
        for y in 0..src.height() {
            dst.row_mut(y).copy_from_slice(&src.row(y));
        }
    } else {
        stretch_nearest(src, dst);
    }
    Ok(())
}

/// Scale by independent factors; the target size truncates toward zero.
pub fn scale_by(src: &Surface, factor_x: f32, factor_y: f32) -> Result<Surface> {
    let width = (src.width() as f32 * factor_x) as i32;
    let height = (src.height() as f32 * factor_y) as i32;
    scale(src, width, height)
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
                s.set_at(x, y, (y * 16 + x) as u32).unwrap();
            }
        }
        s
    }

    #[test]
    fn test_negative_size_rejected() {
        let s = numbered(4, 4, PixelFormat::argb8888());
        assert!(matches!(scale(&s, -1, 4), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_double_duplicates_pixels() {
        let s = numbered(3, 2, PixelFormat::rgb565());
        let d = scale(&s, 6, 4).unwrap();
        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(d.get_at(x, y).unwrap(), s.get_at(x / 2, y / 2).unwrap());
            }
        }
    }

    #[test]
    fn test_halving_samples_centres() {
        let s = numbered(4, 4, PixelFormat::argb8888());
        let d = scale(&s, 2, 2).unwrap();
        // step 2.0, first sample at 1.0
        assert_eq!(d.get_at(0, 0).unwrap(), s.get_at(1, 1).unwrap());
        assert_eq!(d.get_at(1, 1).unwrap(), s.get_at(3, 3).unwrap());
    }

    #[test]
    fn test_zero_size() {
        let s = numbered(4, 4, PixelFormat::argb8888());
        let d = scale(&s, 0, 7).unwrap();
        assert_eq!((d.width(), d.height()), (0, 7));
    }

    #[test]
    fn test_scale_into_format_rules() {
        let s = numbered(4, 4, PixelFormat::argb8888());
        let mut bad = Surface::new(8, 8, PixelFormat::abgr8888()).unwrap();
        assert!(matches!(scale_into(&s, &mut bad), Err(Error::IncompatibleSurfaces(_))));
        // RGBA into RGBX is fine.
        let mut ok = Surface::new(8, 8, PixelFormat::xrgb8888()).unwrap();
        scale_into(&s, &mut ok).unwrap();
        assert_eq!(ok.get_at(7, 7).unwrap(), s.get_at(3, 3).unwrap());
    }

    #[test]
    fn test_scale_into_rejects_overlap() {
        let mut s = numbered(8, 8, PixelFormat::argb8888());
        let view = s.subsurface(crate::basics::RectI::from_xywh(0, 0, 4, 4)).unwrap();
        assert!(scale_into(&view, &mut s).is_err());
    }

    #[test]
    fn test_scale_by() {
        let s = numbered(5, 4, PixelFormat::rgb888());
        let d = scale_by(&s, 1.5, 0.5).unwrap();
        assert_eq!((d.width(), d.height()), (7, 2));
    }

    #[quickcheck]
    fn same_size_is_identity(w: u8, h: u8) -> bool {
        let (w, h) = (w as u32 % 17 + 1, h as u32 % 13 + 1);
        let s = numbered(w, h, PixelFormat::rgb888());
        scale(&s, w as i32, h as i32).unwrap().same_pixels(&s)
    }
}
