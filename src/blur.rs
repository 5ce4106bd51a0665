//! Separable box and Gaussian blurs.
//!
//! Both filters decode the source into a per-channel plane, run a
//! vertical pass then a horizontal pass, and encode the result. Every
//! channel is filtered independently, alpha included.
//!
//! At the borders `repeat_edge` extends the surface with copies of the
//! edge pixel. Without it the window is truncated to the samples inside
//! the surface and normalized by what it actually covered, so a flat
//! field stays flat under either policy.
//!
//! The destination must not share memory with the source: each pass
//! reads source rows after earlier output rows have been written.

use log::trace;

use crate::color::Rgba8;
use crate::error::{try_zeroed, Error, Result};
use crate::surface::Surface;

// ============================================================================
// Validation
// ============================================================================

/// Common preconditions. Returns the radius clamped below the smaller
/// surface dimension.
fn check_blur(src: &Surface, dst: &Surface, radius: i32, what: &str) -> Result<usize> {
    if radius < 0 {
        return Err(Error::invalid(format!("{what} must not be negative, got {radius}")));
    }
    if src.format().is_indexed() {
        return Err(Error::unsupported("indexed surfaces cannot be blurred"));
    }
    if dst.width() != src.width() || dst.height() != src.height() {
        return Err(Error::incompatible("destination surface not the same size"));
    }
    if src.shares_memory_with(dst) {
        return Err(Error::incompatible(
            "destination shares pixels with the source (same surface, subsurface or shared buffer)",
        ));
    }
    if dst.bytes_per_pixel() != src.bytes_per_pixel() {
        return Err(Error::incompatible("source and destination need the same depth"));
    }
    let limit = src.width().min(src.height()) as usize;
    Ok((radius as usize).min(limit.saturating_sub(1)))
}

// ============================================================================
// Channel planes
// ============================================================================

fn load_plane<T: Copy + Default>(src: &Surface, widen: impl Fn(u8) -> T) -> Result<Vec<[T; 4]>> {
    let (w, h) = (src.width() as usize, src.height() as usize);
    let mut plane = try_zeroed::<[T; 4]>(w * h, "blur plane")?;
    let fmt = src.format();
    for y in 0..h {
        for x in 0..w {
            let c = fmt.decode(src.get_raw(x as i32, y as i32));
            plane[y * w + x] = [widen(c.r), widen(c.g), widen(c.b), widen(c.a)];
        }
    }
    Ok(plane)
}

fn store_plane<T: Copy>(plane: &[[T; 4]], dst: &mut Surface, narrow: impl Fn(T) -> u8) {
    let w = dst.width() as usize;
    let fmt = dst.format().clone();
    for (i, px) in plane.iter().enumerate() {
        let c = Rgba8::new(narrow(px[0]), narrow(px[1]), narrow(px[2]), narrow(px[3]));
        dst.put_raw((i % w) as i32, (i / w) as i32, fmt.encode(c));
    }
}

/// Shape of one separable pass: `lines` lines of `len` samples, sample
/// `i` of line `l` at `l * line_step + i * step`.
#[derive(Debug, Clone, Copy)]
struct Lines {
    lines: usize,
    len: usize,
    step: usize,
    line_step: usize,
}

impl Lines {
    fn columns(w: usize, h: usize) -> Self {
        Lines { lines: w, len: h, step: w, line_step: 1 }
    }

    fn rows(w: usize, h: usize) -> Self {
        Lines { lines: h, len: w, step: 1, line_step: w }
    }

    #[inline]
    fn at(&self, line: usize, i: usize) -> usize {
        line * self.line_step + i * self.step
    }
}

// ============================================================================
// Box blur
// ============================================================================

#[inline]
fn add4(sum: &mut [u32; 4], v: &[u32; 4]) {
    for c in 0..4 {
        sum[c] += v[c];
    }
}

#[inline]
fn sub4(sum: &mut [u32; 4], v: &[u32; 4]) {
    for c in 0..4 {
        sum[c] -= v[c];
    }
}

/// Sliding-window mean over each line; `radius < shape.len`.
fn box_pass(src: &[[u32; 4]], dst: &mut [[u32; 4]], shape: Lines, radius: usize, repeat: bool) {
    let len = shape.len;
    for l in 0..shape.lines {
        let first = src[shape.at(l, 0)];
        let last = src[shape.at(l, len - 1)];
        let mut sum = [0u32; 4];
        let mut count = 0u32;
        for i in 0..=radius {
            add4(&mut sum, &src[shape.at(l, i)]);
            count += 1;
        }
        if repeat {
            for c in 0..4 {
                sum[c] += first[c] * radius as u32;
            }
            count += radius as u32;
        }

        for i in 0..len {
            let out = &mut dst[shape.at(l, i)];
            for c in 0..4 {
                out[c] = (sum[c] + count / 2) / count;
            }

            if i >= radius {
                sub4(&mut sum, &src[shape.at(l, i - radius)]);
                count -= 1;
            } else if repeat {
                sub4(&mut sum, &first);
                count -= 1;
            }
            if i + radius + 1 < len {
                add4(&mut sum, &src[shape.at(l, i + radius + 1)]);
                count += 1;
            } else if repeat {
                add4(&mut sum, &last);
                count += 1;
            }
        }
    }
}

/// Box-blur `src` with a `(2 * radius + 1)`-wide window.
pub fn box_blur(src: &Surface, radius: i32, repeat_edge: bool) -> Result<Surface> {
    let mut dst = src.new_like(src.width(), src.height())?;
    box_blur_into(src, &mut dst, radius, repeat_edge)?;
    Ok(dst)
}

/// Box-blur `src` into `dst`, which must match its size and depth and
/// must not share memory with it.
pub fn box_blur_into(src: &Surface, dst: &mut Surface, radius: i32, repeat_edge: bool) -> Result<()> {
    let radius = check_blur(src, dst, radius, "radius")?;
    let (w, h) = (src.width() as usize, src.height() as usize);
    if w == 0 || h == 0 {
        return Ok(());
    }
    trace!("box blur {w}x{h} radius {radius} repeat {repeat_edge}");

    let _src_lock = src.lock();
    let _dst_lock = dst.lock();
    let plane = load_plane::<u32>(src, u32::from)?;
    let mut vertical = try_zeroed::<[u32; 4]>(w * h, "blur plane")?;
    box_pass(&plane, &mut vertical, Lines::columns(w, h), radius, repeat_edge);
    let mut out = plane;
    box_pass(&vertical, &mut out, Lines::rows(w, h), radius, repeat_edge);
    store_plane(&out, dst, |v| v.min(255) as u8);
    Ok(())
}

// ============================================================================
// Gaussian blur
// ============================================================================

/// Half of a normalized Gaussian kernel: `lut[i]` weighs offsets `±i`.
fn gaussian_lut(sigma: usize) -> Vec<f32> {
    let radius = sigma * 2;
    let two_sigma_sq = 2.0 * (sigma as f32) * (sigma as f32);
    let mut lut: Vec<f32> = (0..=radius)
        .map(|i| (-((i * i) as f32) / two_sigma_sq).exp())
        .collect();
    let total = lut.iter().skip(1).sum::<f32>() * 2.0 + lut[0];
    for w in lut.iter_mut() {
        *w /= total;
    }
    lut
}

fn gaussian_pass(src: &[[f32; 4]], dst: &mut [[f32; 4]], shape: Lines, lut: &[f32], repeat: bool) {
    let len = shape.len as isize;
    let radius = lut.len() as isize - 1;
    for l in 0..shape.lines {
        for i in 0..len {
            let mut acc = [0f32; 4];
            let mut weight = 0f32;
            for j in -radius..=radius {
                let k = i + j;
                let idx = if (0..len).contains(&k) {
                    k
                } else if repeat {
                    k.clamp(0, len - 1)
                } else {
                    continue;
                };
                let wgt = lut[j.unsigned_abs()];
                let v = &src[shape.at(l, idx as usize)];
                for c in 0..4 {
                    acc[c] += v[c] * wgt;
                }
                weight += wgt;
            }
            let out = &mut dst[shape.at(l, i as usize)];
            for c in 0..4 {
                out[c] = acc[c] / weight;
            }
        }
    }
}

/// Gaussian-blur `src` with standard deviation `sigma`; the kernel reaches
/// `2 * sigma` pixels each way.
pub fn gaussian_blur(src: &Surface, sigma: i32, repeat_edge: bool) -> Result<Surface> {
    let mut dst = src.new_like(src.width(), src.height())?;
    gaussian_blur_into(src, &mut dst, sigma, repeat_edge)?;
    Ok(dst)
}

/// Gaussian-blur `src` into `dst`, which must match its size and depth and
/// must not share memory with it.
pub fn gaussian_blur_into(src: &Surface, dst: &mut Surface, sigma: i32, repeat_edge: bool) -> Result<()> {
    let sigma = check_blur(src, dst, sigma, "sigma")?;
    let (w, h) = (src.width() as usize, src.height() as usize);
    if w == 0 || h == 0 {
        return Ok(());
    }

    let _src_lock = src.lock();
    let _dst_lock = dst.lock();
    if sigma == 0 {
        for y in 0..src.height() {
            dst.row_mut(y).copy_from_slice(&src.row(y));
        }
        return Ok(());
    }
    trace!("gaussian blur {w}x{h} sigma {sigma} repeat {repeat_edge}");

    let lut = gaussian_lut(sigma);
    let plane = load_plane::<f32>(src, f32::from)?;
    let mut vertical = try_zeroed::<[f32; 4]>(w * h, "blur plane")?;
    gaussian_pass(&plane, &mut vertical, Lines::columns(w, h), &lut, repeat_edge);
    let mut out = plane;
    gaussian_pass(&vertical, &mut out, Lines::rows(w, h), &lut, repeat_edge);
    store_plane(&out, dst, |v| (v + 0.5).clamp(0.0, 255.0) as u8);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::RectI;
    use crate::pixel_format::{Palette, PixelFormat};
    use quickcheck_macros::quickcheck;

    fn filled(w: u32, h: u32, format: PixelFormat, c: Rgba8) -> Surface {
        let mut s = Surface::new(w, h, format).unwrap();
        let v = s.format().encode(c);
        s.fill(v);
        s
    }

    fn dot(w: u32, h: u32) -> Surface {
        let mut s = filled(w, h, PixelFormat::argb8888(), Rgba8::new(0, 0, 0, 255));
        s.set_color(w as i32 / 2, h as i32 / 2, Rgba8::new(255, 255, 255, 255)).unwrap();
        s
    }

    #[test]
    fn test_box_blur_zero_radius() {
        let s = dot(5, 5);
        assert!(box_blur(&s, 0, true).unwrap().same_pixels(&s));
    }

    #[test]
    fn test_box_blur_spreads_pixel() {
        let s = dot(7, 7);
        let d = box_blur(&s, 1, true).unwrap();
        // 255 / 9 rounded
        assert_eq!(d.get_color(3, 3).unwrap().r, 28);
        assert_eq!(d.get_color(2, 2).unwrap().r, 28);
        assert_eq!(d.get_color(1, 1).unwrap().r, 0);
        assert_eq!(d.get_color(3, 3).unwrap().a, 255);
    }

    #[test]
    fn test_box_blur_edge_policies() {
        // Single bright column on the left edge.
        let mut s = filled(4, 4, PixelFormat::argb8888(), Rgba8::new(0, 0, 0, 255));
        for y in 0..4 {
            s.set_color(0, y, Rgba8::new(90, 0, 0, 255)).unwrap();
        }
        // Repeat: window at x=0 is [90, 90, 0] -> 60.
        assert_eq!(box_blur(&s, 1, true).unwrap().get_color(0, 1).unwrap().r, 60);
        // Truncated: window at x=0 is [90, 0] -> 45.
        assert_eq!(box_blur(&s, 1, false).unwrap().get_color(0, 1).unwrap().r, 45);
    }

    #[test]
    fn test_radius_is_clamped() {
        let s = filled(3, 8, PixelFormat::rgb888(), Rgba8::new(10, 20, 30, 255));
        let d = box_blur(&s, 50, false).unwrap();
        assert!(d.same_pixels(&s));
    }

    #[test]
    fn test_gaussian_blur_spreads_symmetrically() {
        let s = dot(9, 9);
        let d = gaussian_blur(&s, 1, true).unwrap();
        let centre = d.get_color(4, 4).unwrap().r;
        assert!(centre > 0 && centre < 255);
        assert_eq!(d.get_color(3, 4).unwrap(), d.get_color(5, 4).unwrap());
        assert_eq!(d.get_color(4, 3).unwrap(), d.get_color(4, 5).unwrap());
        assert_eq!(d.get_color(0, 0).unwrap().r, 0);
    }

    #[test]
    fn test_gaussian_zero_sigma_copies() {
        let s = dot(4, 3);
        assert!(gaussian_blur(&s, 0, false).unwrap().same_pixels(&s));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let s = dot(4, 4);
        assert!(matches!(box_blur(&s, -1, true), Err(Error::InvalidArgument(_))));
        assert!(matches!(gaussian_blur(&s, -3, true), Err(Error::InvalidArgument(_))));
        let idx = Surface::new(4, 4, PixelFormat::indexed8(Palette::grayscale())).unwrap();
        assert!(matches!(box_blur(&idx, 1, true), Err(Error::UnsupportedFormat(_))));
        let mut small = Surface::new(3, 4, PixelFormat::argb8888()).unwrap();
        assert!(matches!(box_blur_into(&s, &mut small, 1, true), Err(Error::IncompatibleSurfaces(_))));
    }

    #[test]
    fn test_rejects_aliased_destination() {
        let s = dot(6, 6);
        let before = s.copy().unwrap();

        // A full-size view of the source is the source itself.
        let mut same = s.subsurface(RectI::from_xywh(0, 0, 6, 6)).unwrap();
        assert!(matches!(box_blur_into(&s, &mut same, 1, true), Err(Error::IncompatibleSurfaces(_))));
        assert!(matches!(gaussian_blur_into(&s, &mut same, 1, true), Err(Error::IncompatibleSurfaces(_))));

        // Two overlapping views of one buffer.
        let big = dot(12, 6);
        let left = big.subsurface(RectI::from_xywh(0, 0, 6, 6)).unwrap();
        let mut middle = big.subsurface(RectI::from_xywh(3, 0, 6, 6)).unwrap();
        assert!(matches!(box_blur_into(&left, &mut middle, 1, false), Err(Error::IncompatibleSurfaces(_))));

        assert!(s.same_pixels(&before));
    }

    #[quickcheck]
    fn box_blur_keeps_flat_field(r: u8, g: u8, b: u8, w: u8, h: u8, radius: u8, repeat: bool) -> bool {
        let c = Rgba8::new(r, g, b, 255);
        let s = filled(w as u32 % 12 + 1, h as u32 % 12 + 1, PixelFormat::argb8888(), c);
        let d = box_blur(&s, radius as i32 % 16, repeat).unwrap();
        d.same_pixels(&s)
    }

    #[quickcheck]
    fn gaussian_blur_keeps_flat_field(v: u8, sigma: u8, repeat: bool) -> bool {
        let c = Rgba8::new(v, v / 2, 255 - v, 255);
        let s = filled(9, 7, PixelFormat::rgb888(), c);
        let d = gaussian_blur(&s, sigma as i32 % 5, repeat).unwrap();
        d.same_pixels(&s)
    }
}
