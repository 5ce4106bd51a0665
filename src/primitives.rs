//! Basic shape primitives: pixels, spans, rectangles and Bresenham lines.
//!
//! Every routine takes an unpacked [`Rgba8`] color, maps it into the
//! surface format once, and writes only inside the surface clip rectangle.
//! Opaque colors (alpha 255) are stored directly; translucent colors blend
//! each touched pixel with [`put_pixel_alpha`].

use crate::basics::RectI;
use crate::clip::clip_line;
use crate::color::Rgba8;
use crate::error::Result;
use crate::surface::{write_pixel, Surface};

// ============================================================================
// Single pixel blending
// ============================================================================

/// Blend a native `color` into the pixel at (x, y) with factor `alpha`.
///
/// Indexed surfaces interpolate the two palette colors and store the
/// nearest palette entry. True-color surfaces interpolate each masked
/// channel (alpha included when present) as `d + ((s - d) * alpha >> 8)`.
pub(crate) fn put_pixel_alpha(surf: &mut Surface, x: i32, y: i32, color: u32, alpha: u8) {
    if !surf.clip_rect().hit_test(x, y) {
        return;
    }
    if alpha == 255 {
        surf.put_raw(x, y, color);
        return;
    }
    let dc = surf.get_raw(x, y);
    let out = blend_native(surf, dc, color, alpha);
    surf.put_raw(x, y, out);
}

#[inline]
fn blend_native(surf: &Surface, dc: u32, color: u32, alpha: u8) -> u32 {
    let fmt = surf.format();
    if let Some(pal) = fmt.palette() {
        let d = pal.get(dc as u8);
        let s = pal.get(color as u8);
        let mixed = Rgba8::new_opaque(
            Rgba8::gfx_lerp(d.r, s.r, alpha),
            Rgba8::gfx_lerp(d.g, s.g, alpha),
            Rgba8::gfx_lerp(d.b, s.b, alpha),
        );
        return pal.nearest(mixed) as u32;
    }
    let mut out = 0u32;
    for ch in 0..4 {
        let m = fmt.mask(ch);
        if m == 0 {
            continue;
        }
        let sh = fmt.shift(ch);
        let d = ((dc & m) >> sh) as i32;
        let s = ((color & m) >> sh) as i32;
        let v = d + (((s - d) * alpha as i32) >> 8);
        out |= ((v as u32) << sh) & m;
    }
    out
}

/// Blend over an already clipped rectangle.
fn blend_rect(surf: &mut Surface, r: RectI, color: u32, alpha: u8) {
    for y in r.y1..=r.y2 {
        for x in r.x1..=r.x2 {
            let dc = surf.get_raw(x, y);
            let out = blend_native(surf, dc, color, alpha);
            surf.put_raw(x, y, out);
        }
    }
}

/// Store an opaque native value over an already clipped rectangle.
fn store_rect(surf: &mut Surface, r: RectI, color: u32) {
    let bpp = surf.bytes_per_pixel();
    for y in r.y1..=r.y2 {
        let start = surf.offset_of(r.x1, y);
        let end = surf.offset_of(r.x2 + 1, y);
        for px in surf.pixels_mut()[start..end].chunks_exact_mut(bpp) {
            write_pixel(px, bpp, color);
        }
    }
}

// ============================================================================
// Pixels
// ============================================================================

/// Draw one pixel, blending when `color.a < 255`.
pub fn pixel(surf: &mut Surface, x: i32, y: i32, color: Rgba8) -> Result<()> {
    let native = surf.format().encode(color);
    put_pixel_alpha(surf, x, y, native, color.a);
    Ok(())
}

/// Draw one pixel with its alpha scaled by `weight / 256`.
#[inline]
pub(crate) fn pixel_weight(surf: &mut Surface, x: i32, y: i32, color: Rgba8, weight: u32) {
    let a = ((color.a as u32 * weight) >> 8) as u8;
    let c = color.with_alpha(a);
    let native = surf.format().encode(c);
    put_pixel_alpha(surf, x, y, native, a);
}

// ============================================================================
// Spans and rectangles
// ============================================================================

/// Fill the rectangle spanned by two corners, blending translucent colors.
pub fn filled_rect_alpha(surf: &mut Surface, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgba8) -> Result<()> {
    let mut r = RectI::new(x1, y1, x2, y2);
    r.normalize();
    if !r.clip(&surf.clip_rect()) {
        return Ok(());
    }
    let native = surf.format().encode(color);
    if color.a == 255 {
        store_rect(surf, r, native);
    } else {
        blend_rect(surf, r, native, color.a);
    }
    Ok(())
}

/// Horizontal span from `x1` to `x2` inclusive on row `y`.
pub fn hline(surf: &mut Surface, x1: i32, x2: i32, y: i32, color: Rgba8) -> Result<()> {
    filled_rect_alpha(surf, x1, y, x2, y, color)
}

/// Vertical span from `y1` to `y2` inclusive on column `x`.
pub fn vline(surf: &mut Surface, x: i32, y1: i32, y2: i32, color: Rgba8) -> Result<()> {
    filled_rect_alpha(surf, x, y1, x, y2, color)
}

/// Rectangle outline. Corners are drawn once even when blending.
pub fn rectangle(surf: &mut Surface, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgba8) -> Result<()> {
    if x1 == x2 && y1 == y2 {
        return pixel(surf, x1, y1, color);
    }
    if x1 == x2 {
        return vline(surf, x1, y1, y2, color);
    }
    if y1 == y2 {
        return hline(surf, x1, x2, y1, color);
    }
    let (x1, x2) = (x1.min(x2), x1.max(x2));
    let (y1, y2) = (y1.min(y2), y1.max(y2));
    hline(surf, x1, x2, y1, color)?;
    hline(surf, x1, x2, y2, color)?;
    if y2 - y1 > 1 {
        vline(surf, x1, y1 + 1, y2 - 1, color)?;
        vline(surf, x2, y1 + 1, y2 - 1, color)?;
    }
    Ok(())
}

// ============================================================================
// Lines
// ============================================================================

/// Draw a line with both endpoints included.
///
/// The segment is clipped first; axis-aligned lines take the span
/// routines. Opaque colors use a byte-offset Bresenham walk, translucent
/// colors a midpoint walk blending one pixel at a time so no pixel is
/// visited twice.
pub fn line(surf: &mut Surface, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgba8) -> Result<()> {
    let clip = surf.clip_rect();
    let (mut x1, mut y1, mut x2, mut y2) = (x1, y1, x2, y2);
    if !clip_line(&clip, &mut x1, &mut y1, &mut x2, &mut y2) {
        return Ok(());
    }

    if x1 == x2 {
        if y1 == y2 {
            return pixel(surf, x1, y1, color);
        }
        return vline(surf, x1, y1, y2, color);
    }
    if y1 == y2 {
        return hline(surf, x1, x2, y1, color);
    }

    let dx = x2 - x1;
    let dy = y2 - y1;
    let sx: i32 = if dx >= 0 { 1 } else { -1 };
    let sy: i32 = if dy >= 0 { 1 } else { -1 };

    if color.a == 255 {
        let native = surf.format().encode(color);
        let bpp = surf.bytes_per_pixel();
        let mut major = sx * dx + 1;
        let mut minor = sy * dy + 1;
        let mut step_major = bpp as isize * sx as isize;
        let mut step_minor = surf.pitch() as isize * sy as isize;
        if major < minor {
            std::mem::swap(&mut major, &mut minor);
            std::mem::swap(&mut step_major, &mut step_minor);
        }
        let mut off = surf.offset_of(x1, y1) as isize;
        let mut buf = surf.pixels_mut();
        let mut acc = 0;
        for _ in 0..major {
            write_pixel(&mut buf[off as usize..], bpp, native);
            acc += minor;
            if acc >= major {
                acc -= major;
                off += step_minor;
            }
            off += step_major;
        }
        return Ok(());
    }

    let native = surf.format().encode(color);
    let ax = dx.abs() << 1;
    let ay = dy.abs() << 1;
    let (mut x, mut y) = (x1, y1);
    if ax > ay {
        let mut d = ay - (ax >> 1);
        while x != x2 {
            put_pixel_alpha(surf, x, y, native, color.a);
            if d > 0 || (d == 0 && sx == 1) {
                y += sy;
                d -= ax;
            }
            x += sx;
            d += ay;
        }
    } else {
        let mut d = ax - (ay >> 1);
        while y != y2 {
            put_pixel_alpha(surf, x, y, native, color.a);
            if d > 0 || (d == 0 && sy == 1) {
                x += sx;
                d -= ay;
            }
            y += sy;
            d += ax;
        }
    }
    put_pixel_alpha(surf, x, y, native, color.a);
    Ok(())
}
