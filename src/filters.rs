//! Per-pixel color filters.
//!
//! Grayscale and invert run through the selected [`simd`](crate::simd)
//! color kernels when both surfaces share a 32-bit format whose R, G and B
//! channels are whole bytes; every other format goes through
//! decode/encode with the same arithmetic. The remaining filters are
//! scalar.

use log::trace;

use crate::color::{hsl_to_rgb, rgb_to_hsl, Rgba8};
use crate::error::{try_zeroed, Error, Result};
use crate::pixel_format::{PixelFormat, A, B, G, R};
use crate::simd::{self, gray_level, ChannelShifts};
use crate::surface::Surface;

// ============================================================================
// Shared plumbing
// ============================================================================

fn check_same_shape(src: &Surface, dst: &Surface) -> Result<()> {
    if dst.width() != src.width() || dst.height() != src.height() {
        return Err(Error::incompatible(format!(
            "destination is {}x{}, source is {}x{}",
            dst.width(),
            dst.height(),
            src.width(),
            src.height()
        )));
    }
    if dst.bytes_per_pixel() != src.bytes_per_pixel() {
        return Err(Error::incompatible("source and destination need the same depth"));
    }
    if src.shares_memory_with(dst) {
        return Err(Error::incompatible("destination overlaps the source"));
    }
    Ok(())
}

/// Channel shifts for the packed 32-bit kernels, when both formats allow
/// them: 4 bytes per pixel, byte-aligned R/G/B and identical masks.
fn packed_shifts(src: &PixelFormat, dst: &PixelFormat) -> Option<ChannelShifts> {
    if src.bytes_per_pixel() != 4 || src.is_indexed() || dst.is_indexed() {
        return None;
    }
    if [R, G, B, A].iter().any(|&c| src.mask(c) != dst.mask(c)) {
        return None;
    }
    src.channel_byte(R)?;
    src.channel_byte(G)?;
    src.channel_byte(B)?;
    Some(ChannelShifts {
        r: src.shift(R),
        g: src.shift(G),
        b: src.shift(B),
    })
}

/// Decode each source pixel, map it, and encode into `dst`.
fn map_colors(src: &Surface, dst: &mut Surface, f: impl Fn(Rgba8) -> Rgba8) {
    let sfmt = src.format().clone();
    let dfmt = dst.format().clone();
    for y in 0..src.height() as i32 {
        for x in 0..src.width() as i32 {
            let c = sfmt.decode(src.get_raw(x, y));
            dst.put_raw(x, y, dfmt.encode(f(c)));
        }
    }
}

fn map_colors_in_place(surf: &mut Surface, f: impl Fn(Rgba8) -> Rgba8) {
    let fmt = surf.format().clone();
    for y in 0..surf.height() as i32 {
        for x in 0..surf.width() as i32 {
            let c = fmt.decode(surf.get_raw(x, y));
            surf.put_raw(x, y, fmt.encode(f(c)));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ColorOp {
    Grayscale,
    Invert,
}

impl ColorOp {
    fn color(self, c: Rgba8) -> Rgba8 {
        match self {
            ColorOp::Grayscale => {
                let v = gray_level(c.r as u32, c.g as u32, c.b as u32).min(255) as u8;
                Rgba8::new(v, v, v, c.a)
            }
            ColorOp::Invert => c.inverted(),
        }
    }

    fn packed_row(self, src: &[u8], dst: &mut [u8], shifts: ChannelShifts) {
        let k = simd::color_kernels();
        match self {
            ColorOp::Grayscale => k.grayscale_row(src, dst, shifts),
            ColorOp::Invert => k.invert_row(src, dst, shifts.rgb_mask()),
        }
    }

    fn apply(self, src: &Surface, dst: &mut Surface) -> Result<()> {
        check_same_shape(src, dst)?;
        let _src_lock = src.lock();
        let _dst_lock = dst.lock();
        match packed_shifts(src.format(), dst.format()) {
            Some(shifts) => {
                trace!("{self:?}: packed kernels on {}", simd::color_kernels().backend());
                for y in 0..src.height() {
                    self.packed_row(&src.row(y), &mut dst.row_mut(y), shifts);
                }
            }
            None => {
                trace!("{self:?}: per-pixel path");
                map_colors(src, dst, |c| self.color(c));
            }
        }
        Ok(())
    }

    fn apply_in_place(self, surf: &mut Surface) -> Result<()> {
        let _lock = surf.lock();
        match packed_shifts(surf.format(), surf.format()) {
            Some(shifts) => {
                let mut line = try_zeroed::<u8>(surf.row_bytes(), "color filter row")?;
                for y in 0..surf.height() {
                    line.copy_from_slice(&surf.row(y));
                    self.packed_row(&line, &mut surf.row_mut(y), shifts);
                }
            }
            None => map_colors_in_place(surf, |c| self.color(c)),
        }
        Ok(())
    }
}

// ============================================================================
// Grayscale and invert
// ============================================================================

/// Luma-weighted grayscale copy of `src`; alpha is kept.
pub fn grayscale(src: &Surface) -> Result<Surface> {
    let mut dst = src.new_like(src.width(), src.height())?;
    ColorOp::Grayscale.apply(src, &mut dst)?;
    Ok(dst)
}

/// Grayscale `src` into `dst`, which must have the same size and depth.
pub fn grayscale_into(src: &Surface, dst: &mut Surface) -> Result<()> {
    ColorOp::Grayscale.apply(src, dst)
}

pub fn grayscale_in_place(surf: &mut Surface) -> Result<()> {
    ColorOp::Grayscale.apply_in_place(surf)
}

/// Copy of `src` with R, G and B complemented; alpha is kept.
pub fn invert(src: &Surface) -> Result<Surface> {
    let mut dst = src.new_like(src.width(), src.height())?;
    ColorOp::Invert.apply(src, &mut dst)?;
    Ok(dst)
}

/// Invert `src` into `dst`, which must have the same size and depth.
pub fn invert_into(src: &Surface, dst: &mut Surface) -> Result<()> {
    ColorOp::Invert.apply(src, dst)
}

pub fn invert_in_place(surf: &mut Surface) -> Result<()> {
    ColorOp::Invert.apply_in_place(surf)
}

// ============================================================================
// Solid overlay
// ============================================================================

/// Paint `color` (a packed value in the source format) wherever the source
/// alpha is non-zero. With `keep_alpha` the painted pixels take the
/// source alpha instead of the color's own.
///
/// Pixels with zero alpha stay transparent black. A format without an
/// alpha channel yields a plain copy.
pub fn solid_overlay(src: &Surface, color: u32, keep_alpha: bool) -> Result<Surface> {
    if !src.format().has_alpha() {
        return src.copy();
    }
    let mut dst = src.new_like(src.width(), src.height())?;
    solid_overlay_into(src, &mut dst, color, keep_alpha)?;
    Ok(dst)
}

/// Overlay into `dst`, which must have the source's size and format.
/// Pixels where the source alpha is zero are left untouched.
pub fn solid_overlay_into(src: &Surface, dst: &mut Surface, color: u32, keep_alpha: bool) -> Result<()> {
    check_same_shape(src, dst)?;
    if src.format() != dst.format() {
        return Err(Error::incompatible("source and destination need the same format"));
    }
    let amask = src.format().mask(A);
    if amask == 0 {
        return Ok(());
    }
    let base = if keep_alpha { color & !amask } else { color };

    let _src_lock = src.lock();
    let _dst_lock = dst.lock();
    for y in 0..src.height() as i32 {
        for x in 0..src.width() as i32 {
            let alpha = src.get_raw(x, y) & amask;
            if alpha != 0 {
                dst.put_raw(x, y, if keep_alpha { base | alpha } else { base });
            }
        }
    }
    Ok(())
}

// ============================================================================
// HSL adjustment
// ============================================================================

fn check_hsl(saturation: f32, lightness: f32) -> Result<(f32, f32)> {
    if !(-1.0..=1.0).contains(&saturation) {
        return Err(Error::invalid(format!("saturation must be in [-1, 1], got {saturation}")));
    }
    if !(-1.0..=1.0).contains(&lightness) {
        return Err(Error::invalid(format!("lightness must be in [-1, 1], got {lightness}")));
    }
    Ok((saturation, lightness))
}

fn hsl_mapper(hue: f32, saturation: f32, lightness: f32) -> impl Fn(Rgba8) -> Rgba8 {
    let dh = (hue % 360.0) / 360.0;
    move |c: Rgba8| {
        let hsl = rgb_to_hsl(c.r, c.g, c.b).adjusted(dh, saturation, lightness);
        let (r, g, b) = hsl_to_rgb(hsl);
        Rgba8::new(r, g, b, c.a)
    }
}

/// Shift hue by `hue` degrees and scale saturation and lightness by
/// deltas in [-1, 1]. Alpha is kept.
pub fn adjust_hsl(src: &Surface, hue: f32, saturation: f32, lightness: f32) -> Result<Surface> {
    check_hsl(saturation, lightness)?;
    let mut dst = src.new_like(src.width(), src.height())?;
    adjust_hsl_into(src, &mut dst, hue, saturation, lightness)?;
    Ok(dst)
}

/// HSL adjustment into `dst`, which must have the source's size and format.
pub fn adjust_hsl_into(src: &Surface, dst: &mut Surface, hue: f32, saturation: f32, lightness: f32) -> Result<()> {
    let (saturation, lightness) = check_hsl(saturation, lightness)?;
    check_same_shape(src, dst)?;
    if src.format() != dst.format() {
        return Err(Error::incompatible("source and destination need the same format"));
    }
    let _src_lock = src.lock();
    let _dst_lock = dst.lock();
    map_colors(src, dst, hsl_mapper(hue, saturation, lightness));
    Ok(())
}

// ============================================================================
// Laplacian
// ============================================================================

/// 3x3 edge detection: eight times the centre minus the eight neighbours,
/// clamped per channel (alpha included). Neighbours outside the surface
/// contribute nothing.
pub fn laplacian(src: &Surface) -> Result<Surface> {
    let mut dst = src.new_like(src.width(), src.height())?;
    laplacian_into(src, &mut dst)?;
    Ok(dst)
}

/// Laplacian into `dst`, which must have the source's size and depth.
pub fn laplacian_into(src: &Surface, dst: &mut Surface) -> Result<()> {
    check_same_shape(src, dst)?;
    let (w, h) = (src.width() as i32, src.height() as i32);
    let sfmt = src.format().clone();
    let dfmt = dst.format().clone();
    let _src_lock = src.lock();
    let _dst_lock = dst.lock();

    for y in 0..h {
        for x in 0..w {
            let mut total = [0i32; 4];
            for ny in (y - 1).max(0)..=(y + 1).min(h - 1) {
                for nx in (x - 1).max(0)..=(x + 1).min(w - 1) {
                    if nx == x && ny == y {
                        continue;
                    }
                    let c = sfmt.decode(src.get_raw(nx, ny));
                    total[0] += c.r as i32;
                    total[1] += c.g as i32;
                    total[2] += c.b as i32;
                    total[3] += c.a as i32;
                }
            }
            let c = sfmt.decode(src.get_raw(x, y));
            let edge = |v: u8, t: i32| (v as i32 * 8 - t).clamp(0, 255) as u8;
            let out = Rgba8::new(
                edge(c.r, total[0]),
                edge(c.g, total[1]),
                edge(c.b, total[2]),
                edge(c.a, total[3]),
            );
            dst.put_raw(x, y, dfmt.encode(out));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_format::Palette;
    use crate::simd::{Backend, KernelFamily};

    fn filled(w: u32, h: u32, format: PixelFormat, c: Rgba8) -> Surface {
        let mut s = Surface::new(w, h, format).unwrap();
        let v = s.format().encode(c);
        s.fill(v);
        s
    }

    fn noisy(w: u32, h: u32, format: PixelFormat) -> Surface {
        let mut s = Surface::new(w, h, format).unwrap();
        let mut state = 0x2545_f491u32;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let [r, g, b, a] = state.to_le_bytes();
                s.set_color(x, y, Rgba8::new(r, g, b, a)).unwrap();
            }
        }
        s
    }

    #[test]
    fn test_invert_filled_surface() {
        let s = filled(10, 10, PixelFormat::argb8888(), Rgba8::new(200, 100, 50, 255));
        let d = invert(&s).unwrap();
        assert_eq!((d.width(), d.height()), (10, 10));
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(d.get_color(x, y).unwrap(), Rgba8::new(55, 155, 205, 255));
            }
        }
    }

    #[test]
    fn test_grayscale_levels() {
        let s = filled(3, 3, PixelFormat::argb8888(), Rgba8::new(200, 100, 50, 77));
        let d = grayscale(&s).unwrap();
        assert_eq!(d.get_color(1, 1).unwrap(), Rgba8::new(125, 125, 125, 77));
        let s = filled(3, 3, PixelFormat::rgb888(), Rgba8::new(255, 255, 255, 255));
        assert_eq!(grayscale(&s).unwrap().get_color(2, 0).unwrap(), Rgba8::new(255, 255, 255, 255));
    }

    #[test]
    fn test_packed_and_decoded_paths_agree() {
        let packed = noisy(13, 7, PixelFormat::xrgb8888());
        let mut wide = Surface::new(13, 7, PixelFormat::rgb888()).unwrap();
        for y in 0..7 {
            for x in 0..13 {
                wide.set_color(x, y, packed.get_color(x, y).unwrap()).unwrap();
            }
        }
        let a = grayscale(&packed).unwrap();
        let b = grayscale(&wide).unwrap();
        for y in 0..7 {
            for x in 0..13 {
                assert_eq!(a.get_color(x, y).unwrap(), b.get_color(x, y).unwrap());
            }
        }
    }

    #[test]
    fn test_backends_agree_on_surface() {
        let _g = crate::simd::tests::serial();
        let s = noisy(37, 5, PixelFormat::argb8888());
        simd::set_backend(KernelFamily::Color, "GENERIC").unwrap();
        let gray = grayscale(&s).unwrap();
        let inv = invert(&s).unwrap();
        for b in [Backend::Sse2, Backend::Avx2, Backend::Neon] {
            if simd::is_supported(KernelFamily::Color, b) {
                simd::set_backend(KernelFamily::Color, b.name()).unwrap();
                assert!(grayscale(&s).unwrap().same_pixels(&gray), "{b}");
                assert!(invert(&s).unwrap().same_pixels(&inv), "{b}");
            }
        }
        simd::reset_backends();
    }

    #[test]
    fn test_in_place_matches_copy() {
        let s = noisy(9, 4, PixelFormat::abgr8888());
        let mut t = s.copy().unwrap();
        grayscale_in_place(&mut t).unwrap();
        assert!(t.same_pixels(&grayscale(&s).unwrap()));
        let mut t = s.copy().unwrap();
        invert_in_place(&mut t).unwrap();
        invert_in_place(&mut t).unwrap();
        assert!(t.same_pixels(&s));
    }

    #[test]
    fn test_indexed_invert() {
        let pal = Palette::new(&[Rgba8::new_opaque(0, 0, 0), Rgba8::new_opaque(255, 255, 255)]);
        let mut s = Surface::new(2, 1, PixelFormat::indexed8(pal)).unwrap();
        s.set_at(1, 0, 1).unwrap();
        let d = invert(&s).unwrap();
        assert_eq!(d.get_at(0, 0).unwrap(), 1);
        assert_eq!(d.get_at(1, 0).unwrap(), 0);
    }

    #[test]
    fn test_destination_checks() {
        let s = filled(4, 4, PixelFormat::argb8888(), Rgba8::new(1, 2, 3, 4));
        let mut small = Surface::new(3, 4, PixelFormat::argb8888()).unwrap();
        assert!(matches!(grayscale_into(&s, &mut small), Err(Error::IncompatibleSurfaces(_))));
        let mut shallow = Surface::new(4, 4, PixelFormat::rgb565()).unwrap();
        assert!(matches!(invert_into(&s, &mut shallow), Err(Error::IncompatibleSurfaces(_))));
    }

    #[test]
    fn test_solid_overlay() {
        let fmt = PixelFormat::argb8888();
        let mut s = Surface::new(2, 1, fmt.clone()).unwrap();
        s.set_color(0, 0, Rgba8::new(9, 9, 9, 0)).unwrap();
        s.set_color(1, 0, Rgba8::new(9, 9, 9, 80)).unwrap();
        let red = fmt.encode(Rgba8::new(255, 0, 0, 255));

        let d = solid_overlay(&s, red, false).unwrap();
        assert_eq!(d.get_at(0, 0).unwrap(), 0);
        assert_eq!(d.get_color(1, 0).unwrap(), Rgba8::new(255, 0, 0, 255));

        let d = solid_overlay(&s, red, true).unwrap();
        assert_eq!(d.get_color(1, 0).unwrap(), Rgba8::new(255, 0, 0, 80));
    }

    #[test]
    fn test_solid_overlay_without_alpha_copies() {
        let s = filled(3, 2, PixelFormat::rgb565(), Rgba8::new(10, 200, 30, 255));
        assert!(solid_overlay(&s, 0xffff, false).unwrap().same_pixels(&s));
    }

    #[test]
    fn test_adjust_hsl() {
        let s = filled(2, 2, PixelFormat::argb8888(), Rgba8::new(255, 0, 0, 200));
        assert!(matches!(adjust_hsl(&s, 0.0, 1.5, 0.0), Err(Error::InvalidArgument(_))));
        assert!(matches!(adjust_hsl(&s, 0.0, 0.0, -1.1), Err(Error::InvalidArgument(_))));
        // 120 degrees turns red into green.
        let d = adjust_hsl(&s, 120.0, 0.0, 0.0).unwrap();
        assert_eq!(d.get_color(0, 0).unwrap(), Rgba8::new(0, 255, 0, 200));
        // Full lightness is white, full darkness black.
        assert_eq!(adjust_hsl(&s, 0.0, 0.0, 1.0).unwrap().get_color(1, 1).unwrap(), Rgba8::new(255, 255, 255, 200));
        assert_eq!(adjust_hsl(&s, 0.0, 0.0, -1.0).unwrap().get_color(1, 1).unwrap(), Rgba8::new(0, 0, 0, 200));
        // No change at zero deltas.
        assert!(adjust_hsl(&s, 0.0, 0.0, 0.0).unwrap().same_pixels(&s));
    }

    #[test]
    fn test_laplacian() {
        // Flat interior cancels out; corners keep 8c - 3c.
        let s = filled(3, 3, PixelFormat::argb8888(), Rgba8::new(10, 20, 30, 40));
        let d = laplacian(&s).unwrap();
        assert_eq!(d.get_color(1, 1).unwrap(), Rgba8::new(0, 0, 0, 0));
        assert_eq!(d.get_color(0, 0).unwrap(), Rgba8::new(50, 100, 150, 200));
        // Edge (1, 0) has five neighbours.
        assert_eq!(d.get_color(1, 0).unwrap(), Rgba8::new(30, 60, 90, 120));
    }
}
