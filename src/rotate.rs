//! Rotation by quarter turns and by arbitrary angles, plus the filtered
//! rotate-and-zoom.
//!
//! Angles are in degrees, counter-clockwise. Multiples of 90 take a
//! lossless transpose path. Other angles resample with nearest-neighbour
//! lookups through an inverse 16.16 fixed-point rotation; destination
//! pixels that map outside the source get the background color.
//!
//! [`rotozoom`] works on 32-bit pixels only, staging other formats first,
//! and interpolates bilinearly. Its uncovered corners stay transparent.

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::pixel_format::{PixelFormat, A};
use crate::surface::{write_pixel, Surface};

// ============================================================================
// Quarter turns
// ============================================================================

/// Rotate by a multiple of 90 degrees. `angle` is truncated to whole
/// quarter turns.
pub fn rotate90(src: &Surface, angle: i32) -> Result<Surface> {
    let turns = ((angle / 90) % 4 + 4) % 4;
    let (w, h) = (src.width() as i32, src.height() as i32);
    let (dw, dh) = if turns % 2 == 0 { (w, h) } else { (h, w) };
    let mut dst = src.new_like(dw as u32, dh as u32)?;
    let bpp = src.bytes_per_pixel();
    let _lock = src.lock();

    let pixels = src.pixels();
    for y in 0..dh {
        let mut drow = dst.row_mut(y as u32);
        for (x, d) in drow.chunks_exact_mut(bpp).enumerate() {
            let x = x as i32;
            let (sx, sy) = match turns {
                1 => (w - 1 - y, x),
                2 => (w - 1 - x, h - 1 - y),
                3 => (y, h - 1 - x),
                _ => (x, y),
            };
            let off = src.offset_of(sx, sy);
            d.copy_from_slice(&pixels[off..off + bpp]);
        }
    }
    Ok(dst)
}

// ============================================================================
// Arbitrary angles
// ============================================================================

/// Background for an arbitrary rotation: the colorkey when set, otherwise
/// the top-left pixel with its alpha bits cleared.
fn background(src: &Surface) -> u32 {
    match src.colorkey() {
        Some(key) => key,
        None => src.get_raw(0, 0) & !src.format().mask(A),
    }
}

/// Bounding box of the `w` x `h` rectangle rotated by (sin, cos).
fn rotated_extent(w: u32, h: u32, sin: f64, cos: f64) -> (u32, u32) {
    let (x, y) = (w as f64, h as f64);
    let (cx, cy, sx, sy) = (cos * x, cos * y, sin * x, sin * y);
    let nx = (cx + sy).abs().max((cx - sy).abs()).max((-cx + sy).abs()).max((-cx - sy).abs());
    let ny = (sx + cy).abs().max((sx - cy).abs()).max((-sx + cy).abs()).max((-sx - cy).abs());
    (nx as u32, ny as u32)
}

fn rotate_into(src: &Surface, dst: &mut Surface, bg: u32, sin: f64, cos: f64) {
    let bpp = src.bytes_per_pixel();
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);

    let cy = dh / 2;
    let xd = (sw - dw) << 15;
    let yd = (sh - dh) << 15;
    let isin = (sin * 65536.0) as i64;
    let icos = (cos * 65536.0) as i64;
    let ax = (dw << 15) - (cos * ((dw - 1) << 15) as f64) as i64;
    let ay = (dh << 15) - (sin * ((dw - 1) << 15) as f64) as i64;
    let xmax = (sw << 16) - 1;
    let ymax = (sh << 16) - 1;

    let mut bg_bytes = [0u8; 4];
    write_pixel(&mut bg_bytes, bpp, bg);
    let pixels = src.pixels();

    for y in 0..dh {
        let mut dx = ax + isin * (cy - y) + xd;
        let mut dy = ay - icos * (cy - y) + yd;
        let mut drow = dst.row_mut(y as u32);
        for d in drow.chunks_exact_mut(bpp) {
            if dx < 0 || dy < 0 || dx > xmax || dy > ymax {
                d.copy_from_slice(&bg_bytes[..bpp]);
            } else {
                let off = src.offset_of((dx >> 16) as i32, (dy >> 16) as i32);
                d.copy_from_slice(&pixels[off..off + bpp]);
            }
            dx += icos;
            dy += isin;
        }
    }
}

/// Rotate `src` by `angle` degrees into a new surface sized to the
/// rotated bounding box.
///
/// An empty source is returned as an empty copy.
pub fn rotate(src: &Surface, angle: f32) -> Result<Surface> {
    if src.width() == 0 || src.height() == 0 {
        return src.copy();
    }
    if (angle as f64) % 90.0 == 0.0 {
        trace!("rotate {angle}: quarter-turn path");
        return rotate90(src, angle as i32);
    }

    let rad = angle as f64 * 0.017_453_292_519_943_29;
    let (sin, cos) = rad.sin_cos();
    let (nw, nh) = rotated_extent(src.width(), src.height(), sin, cos);
    let mut dst = src.new_like(nw, nh)?;
    let _lock = src.lock();
    let bg = background(src);
    rotate_into(src, &mut dst, bg, sin, cos);
    Ok(dst)
}

// ============================================================================
// Rotate and zoom
// ============================================================================

/// Smallest zoom magnitude; finer factors are raised to it.
const MIN_ZOOM: f64 = 0.001;

/// Angles closer to zero than this take the pure zoom path.
const MIN_ANGLE: f64 = 0.001;

/// The source itself when its pixels are 32-bit with whole-byte channels,
/// otherwise a copy converted to ABGR8888. Colorkeyed pixels become
/// transparent black in the copy.
fn stage_32bit(src: &Surface) -> Result<Option<Surface>> {
    let fmt = src.format();
    if fmt.bytes_per_pixel() == 4 && !fmt.is_indexed() && fmt.byte_layout().is_some() {
        return Ok(None);
    }
    debug!("rotozoom: staging {}-byte pixels as ABGR8888", fmt.bytes_per_pixel());
    let mut staged = Surface::new(src.width(), src.height(), PixelFormat::abgr8888())?;
    let key = src.colorkey();
    let _lock = src.lock();
    for y in 0..src.height() as i32 {
        for x in 0..src.width() as i32 {
            let raw = src.get_raw(x, y);
            let v = if key == Some(raw) {
                0
            } else {
                staged.format().encode(fmt.decode(raw))
            };
            staged.put_raw(x, y, v);
        }
    }
    Ok(Some(staged))
}

/// Bilinear blend of the four 32-bit pixels around the 16.16 position
/// (`fx`, `fy`), which must lie inside the `w` x `h` source. Neighbours
/// past the last row or column repeat the edge.
#[inline]
fn sample_bilinear(pixels: &[u8], pitch: usize, (w, h): (i64, i64), fx: i64, fy: i64) -> [u8; 4] {
    let (x0, y0) = (fx >> 16, fy >> 16);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (ex, ey) = ((fx & 0xffff) as i32, (fy & 0xffff) as i32);
    let at = |x: i64, y: i64| y as usize * pitch + x as usize * 4;
    let (p00, p01, p10, p11) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));

    let mut out = [0u8; 4];
    for (i, o) in out.iter_mut().enumerate() {
        let (c00, c01) = (pixels[p00 + i] as i32, pixels[p01 + i] as i32);
        let (c10, c11) = (pixels[p10 + i] as i32, pixels[p11 + i] as i32);
        let t1 = (((c01 - c00) * ex) >> 16) + c00;
        let t2 = (((c11 - c10) * ex) >> 16) + c10;
        *o = ((((t2 - t1) * ey) >> 16) + t1) as u8;
    }
    out
}

/// Size of the box holding `w` x `h` rotated by (sin, cos) and zoomed:
/// twice the rounded-up half extents, at least 2 x 2.
fn rotozoom_extent(w: u32, h: u32, sin: f64, cos: f64, zoom: f64) -> (u32, u32) {
    let (x, y) = ((w / 2) as f64, (h / 2) as f64);
    let (cx, cy) = (cos * zoom * x, cos * zoom * y);
    let (sx, sy) = (sin * zoom * x, sin * zoom * y);
    let half_w = (cx + sy).abs().max((cx - sy).abs()).max((-cx + sy).abs()).max((-cx - sy).abs());
    let half_h = (sx + cy).abs().max((sx - cy).abs()).max((-sx + cy).abs()).max((-sx - cy).abs());
    (2 * (half_w.ceil() as u32).max(1), 2 * (half_h.ceil() as u32).max(1))
}

/// Inverse-rotate every destination pixel into the source. `isin` and
/// `icos` are sin / zoom and cos / zoom in 16.16.
fn rotozoom_rotate(src: &Surface, dst: &mut Surface, isin: i64, icos: i64, flip: bool) {
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let (cx, cy) = (dw / 2, dh / 2);
    let xd = (sw - dw) << 15;
    let yd = (sh - dh) << 15;
    let ax = (cx << 16) - icos * cx;
    let ay = (cy << 16) - isin * cx;
    let (xmax, ymax) = ((sw << 16) - 1, (sh << 16) - 1);

    let pitch = src.pitch();
    let pixels = src.pixels();
    for y in 0..dh {
        let mut sdx = ax + isin * (cy - y) + xd;
        let mut sdy = ay - icos * (cy - y) + yd;
        let mut drow = dst.row_mut(y as u32);
        for d in drow.chunks_exact_mut(4) {
            let (fx, fy) = if flip { (xmax - sdx, ymax - sdy) } else { (sdx, sdy) };
            if (0..=xmax).contains(&fx) && (0..=ymax).contains(&fy) {
                d.copy_from_slice(&sample_bilinear(&pixels, pitch, (sw, sh), fx, fy));
            }
            sdx += icos;
            sdy += isin;
        }
    }
}

/// Stretch the source over the whole destination, sampling from the
/// top-left edge in `src / dst` 16.16 steps.
fn rotozoom_zoom(src: &Surface, dst: &mut Surface, flip: bool) {
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let step_x = (sw << 16) / dw;
    let step_y = (sh << 16) / dh;
    let (xmax, ymax) = ((sw - 1) << 16, (sh - 1) << 16);

    let pitch = src.pitch();
    let pixels = src.pixels();
    for y in 0..dh {
        let py = (y * step_y).min(ymax + 0xffff);
        let fy = if flip { (ymax - py).max(0) } else { py };
        let mut drow = dst.row_mut(y as u32);
        for (x, d) in drow.chunks_exact_mut(4).enumerate() {
            let px = (x as i64 * step_x).min(xmax + 0xffff);
            let fx = if flip { (xmax - px).max(0) } else { px };
            d.copy_from_slice(&sample_bilinear(&pixels, pitch, (sw, sh), fx, fy));
        }
    }
}

/// Rotate `src` by `angle` degrees and scale it by `scale`, filtering
/// bilinearly.
///
/// Sources that are not 32-bit with whole-byte channels are converted to
/// ABGR8888 first, and the result keeps that 32-bit format. A rotated
/// result is sized to the zoomed bounding box with transparent corners;
/// without rotation the size is the rounded zoomed size, at least 1 x 1.
/// A negative scale also mirrors both axes. A zero scale or an empty
/// source gives a 0 x 0 surface.
pub fn rotozoom(src: &Surface, angle: f32, scale: f32) -> Result<Surface> {
    if !angle.is_finite() || !scale.is_finite() {
        return Err(Error::invalid(format!("rotozoom needs finite angle and scale, got {angle} and {scale}")));
    }
    if scale == 0.0 || src.width() == 0 || src.height() == 0 {
        return src.new_like(0, 0);
    }

    let staged = stage_32bit(src)?;
    let src = staged.as_ref().unwrap_or(src);
    let flip = scale < 0.0;
    let zoom = (scale.abs() as f64).max(MIN_ZOOM);
    let _lock = src.lock();

    if (angle as f64).abs() > MIN_ANGLE {
        let (sin, cos) = (angle as f64).to_radians().sin_cos();
        let (dw, dh) = rotozoom_extent(src.width(), src.height(), sin, cos, zoom);
        trace!("rotozoom {angle} x{scale}: rotate into {dw}x{dh}");
        let mut dst = Surface::new(dw, dh, src.format().clone())?;
        let isin = (sin / zoom * 65536.0) as i64;
        let icos = (cos / zoom * 65536.0) as i64;
        rotozoom_rotate(src, &mut dst, isin, icos, flip);
        Ok(dst)
    } else {
        let dw = ((src.width() as f64 * zoom + 0.5) as u32).max(1);
        let dh = ((src.height() as f64 * zoom + 0.5) as u32).max(1);
        trace!("rotozoom x{scale}: zoom into {dw}x{dh}");
        let mut dst = Surface::new(dw, dh, src.format().clone())?;
        rotozoom_zoom(src, &mut dst, flip);
        Ok(dst)
    }
}
