//! Scale2x (AdvMAME2x) pixel-art doubling.
//!
//! For source pixel `E` with neighbours
//!
//! ```text
//!     B
//!   D E F
//!     H
//! ```
//!
//! the four output pixels are
//!
//! ```text
//!   E0 = D == B ? D : E     E1 = B == F ? F : E
//!   E2 = D == H ? D : E     E3 = H == F ? F : E
//! ```
//!
//! when `B != H && D != F`, and plain `E` otherwise. Neighbours outside
//! the surface repeat the edge pixel. Pixels compare by raw value, so the
//! result is exact in every format.

use crate::error::{Error, Result};
use crate::surface::Surface;

fn scale2x_rows(src: &Surface, dst: &mut Surface) {
    let bpp = src.bytes_per_pixel();
    let (w, h) = (src.width() as usize, src.height());
    let mut out0 = vec![0u8; w * 2 * bpp];
    let mut out1 = vec![0u8; w * 2 * bpp];
    for y in 0..h {
        let above = src.row(y.saturating_sub(1));
        let here = src.row(y);
        let below = src.row((y + 1).min(h - 1));
        let px = |row: &[u8], x: usize| -> [u8; 4] {
            let mut p = [0u8; 4];
            p[..bpp].copy_from_slice(&row[x * bpp..x * bpp + bpp]);
            p
        };

        for x in 0..w {
            let b = px(&above, x);
            let d = px(&here, x.saturating_sub(1));
            let e = px(&here, x);
            let f = px(&here, (x + 1).min(w - 1));
            let hh = px(&below, x);

            let (e0, e1, e2, e3) = if b != hh && d != f {
                (
                    if d == b { d } else { e },
                    if b == f { f } else { e },
                    if d == hh { d } else { e },
                    if hh == f { f } else { e },
                )
            } else {
                (e, e, e, e)
            };

            let o = x * 2 * bpp;
            out0[o..o + bpp].copy_from_slice(&e0[..bpp]);
            out0[o + bpp..o + 2 * bpp].copy_from_slice(&e1[..bpp]);
            out1[o..o + bpp].copy_from_slice(&e2[..bpp]);
            out1[o + bpp..o + 2 * bpp].copy_from_slice(&e3[..bpp]);
        }
        dst.row_mut(y * 2).copy_from_slice(&out0);
        dst.row_mut(y * 2 + 1).copy_from_slice(&out1);
    }
}

/// Double `src` into a new surface of the same format.
pub fn scale2x(src: &Surface) -> Result<Surface> {
    let mut dst = src.new_like(src.width() * 2, src.height() * 2)?;
    scale2x_into(src, &mut dst)?;
    Ok(dst)
}

/// Double `src` into `dst`, which must be exactly twice as large with a
/// compatible format (same bytes per pixel and RGB masks).
pub fn scale2x_into(src: &Surface, dst: &mut Surface) -> Result<()> {
    if dst.width() != src.width() * 2 || dst.height() != src.height() * 2 {
        return Err(Error::incompatible(format!(
            "destination is {}x{}, expected {}x{}",
            dst.width(),
            dst.height(),
            src.width() * 2,
            src.height() * 2
        )));
    }
    if !src.format().is_compatible(dst.format()) {
        return Err(Error::incompatible("source and destination formats differ"));
    }
    if src.shares_memory_with(dst) {
        return Err(Error::incompatible("destination overlaps the source"));
    }
    if src.width() == 0 || src.height() == 0 {
        return Ok(());
    }
    let _src_lock = src.lock();
    let _dst_lock = dst.lock();
    scale2x_rows(src, dst);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::{Palette, PixelFormat};

    fn from_rows(rows: &[&[u32]], format: PixelFormat) -> Surface {
        let mut s = Surface::new(rows[0].len() as u32, rows.len() as u32, format).unwrap();
        for (y, row) in rows.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                s.set_at(x as i32, y as i32, v).unwrap();
            }
        }
        s
    }

    fn dump(s: &Surface) -> Vec<Vec<u32>> {
        (0..s.height() as i32)
            .map(|y| (0..s.width() as i32).map(|x| s.get_at(x, y).unwrap()).collect())
            .collect()
    }

    #[test]
    fn test_flat_area_is_plain_doubling() {
        let s = from_rows(&[&[5, 5], &[5, 5]], PixelFormat::rgb565());
        let d = scale2x(&s).unwrap();
        assert_eq!(dump(&d), vec![vec![5; 4]; 4]);
    }

    #[test]
    fn test_diagonal_edge_is_smoothed() {
        // A diagonal staircase; the corner pixel picks up its neighbours.
        let s = from_rows(&[&[1, 0, 0], &[0, 1, 0], &[0, 0, 1]], PixelFormat::indexed8(Palette::grayscale()));
        let d = scale2x(&s).unwrap();
        let out = dump(&d);
        // Centre pixel (1,1): B=0 D=0 F=0 H=0 -> B == H, so no change.
        assert_eq!(&out[2][2..4], &[1, 1]);
        // Pixel (1,0) is E=0 with B=0(edge) D=1 F=0 H=1:
        // B != H and D != F; E2 = D == H ? D : E = 1.
        assert_eq!(out[1][2], 1);
        assert_eq!(out[0][2], 0);
    }

    #[test]
    fn test_24bit_pixels() {
        let s = from_rows(&[&[0x123456, 0xabcdef]], PixelFormat::rgb888());
        let d = scale2x(&s).unwrap();
        assert_eq!(dump(&d)[1], vec![0x123456, 0x123456, 0xabcdef, 0xabcdef]);
    }

    #[test]
    fn test_destination_checks() {
        let s = from_rows(&[&[1, 2], &[3, 4]], PixelFormat::argb8888());
        let mut wrong_size = Surface::new(3, 4, PixelFormat::argb8888()).unwrap();
        assert!(scale2x_into(&s, &mut wrong_size).is_err());
        let mut wrong_depth = Surface::new(4, 4, PixelFormat::rgb565()).unwrap();
        assert!(scale2x_into(&s, &mut wrong_depth).is_err());
    }

    #[test]
    fn test_rejects_swapped_channel_order() {
        let s = from_rows(&[&[0xFFFF_0000, 0xFFFF_0000]], PixelFormat::argb8888());
        let mut d = Surface::new(4, 2, PixelFormat::abgr8888()).unwrap();
        assert!(matches!(scale2x_into(&s, &mut d), Err(Error::IncompatibleSurfaces(_))));
        assert_eq!(d.get_at(0, 0).unwrap(), 0);
    }
}
